//! Share scheme configuration
//!
//! Both the secret engine and the vault ledger read the split parameters from
//! here, so the number of on-ledger shares is never hardcoded.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// Default number of shares generated per key.
pub const TOTAL_SHARES: u8 = 5;

/// Default number of shares needed to recover a key.
pub const THRESHOLD: u8 = 3;

/// Shares that never touch the ledger: the heir's private share and the
/// public safety-net share.
pub const OFF_LEDGER_SHARES: u8 = 2;

/// Position of the heir's private share in a split.
pub const HEIR_SHARE_SLOT: usize = 0;

/// Position of the public safety-net share in a split.
pub const PUBLIC_SHARE_SLOT: usize = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    #[error("Threshold {0} is too low: heir and public shares alone must not recover the key")]
    ThresholdTooLow(u8),
    #[error("Threshold {threshold} exceeds total shares {total}")]
    ThresholdExceedsShares { threshold: u8, total: u8 },
    #[error("Heir share plus {ledger} ledger shares cannot reach threshold {threshold}")]
    UnreachableThreshold { threshold: u8, ledger: u8 },
}

/// Split parameters: `threshold`-of-`total_shares`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareScheme {
    /// Total shares generated (N)
    pub total_shares: u8,
    /// Minimum shares needed to reconstruct (M)
    pub threshold: u8,
}

impl Default for ShareScheme {
    fn default() -> Self {
        Self {
            total_shares: TOTAL_SHARES,
            threshold: THRESHOLD,
        }
    }
}

impl ShareScheme {
    pub fn new(threshold: u8, total_shares: u8) -> Result<Self, SchemeError> {
        let scheme = Self {
            total_shares,
            threshold,
        };
        scheme.validate()?;
        Ok(scheme)
    }

    /// Number of wrapped shares a vault must hold.
    pub fn ledger_shares(&self) -> usize {
        self.total_shares.saturating_sub(OFF_LEDGER_SHARES) as usize
    }

    /// Positions of the ledger shares within a split.
    pub fn ledger_slots(&self) -> Range<usize> {
        OFF_LEDGER_SHARES as usize..self.total_shares as usize
    }

    pub fn validate(&self) -> Result<(), SchemeError> {
        if self.threshold <= OFF_LEDGER_SHARES {
            return Err(SchemeError::ThresholdTooLow(self.threshold));
        }
        if self.threshold > self.total_shares {
            return Err(SchemeError::ThresholdExceedsShares {
                threshold: self.threshold,
                total: self.total_shares,
            });
        }
        // The heir must be able to recover without the public share.
        let ledger = self.ledger_shares() as u8;
        if ledger + 1 < self.threshold {
            return Err(SchemeError::UnreachableThreshold {
                threshold: self.threshold,
                ledger,
            });
        }
        Ok(())
    }
}
