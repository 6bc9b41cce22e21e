//! Vault and ledger errors
//!
//! Every rejected transition leaves the vault untouched.

use crate::vault::VaultId;
use heirloom_core::SchemeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// The party a transition is reserved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Beneficiary,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Beneficiary => f.write_str("beneficiary"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Unauthorized: caller is not the vault {required}")]
    Unauthorized { required: Role },

    #[error("Unlock time not reached: claimable after {unlocks_after} ms")]
    UnlockTimeNotReached { unlocks_after: u64 },

    #[error("Vault already claimed")]
    AlreadyClaimed,

    #[error("Invalid shares count: expected {expected}, got {got}")]
    InvalidSharesCount { expected: usize, got: usize },

    #[error("Unlock duration must be greater than zero")]
    InvalidUnlockDuration,

    #[error("Heartbeat at {now} ms is older than last heartbeat {last_heartbeat} ms")]
    StaleTimestamp { last_heartbeat: u64, now: u64 },

    #[error("Balance overflow")]
    BalanceOverflow,

    #[error("Vault not found: {0}")]
    VaultNotFound(VaultId),

    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },
}

impl VaultError {
    /// True for caller mismatches on owner- or beneficiary-gated transitions.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, VaultError::Unauthorized { .. })
    }
}

/// Errors from ledger persistence
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persisted scheme is invalid: {0}")]
    Scheme(#[from] SchemeError),
}
