//! Heirloom Vault Module
//!
//! The dead man's switch itself: a vault holding funds and sealed key shares,
//! kept alive by owner heartbeats and claimable by the beneficiary once the
//! heartbeat lapses.
//!
//! # Concepts
//!
//! - **Heartbeat**: owner resets `last_heartbeat` to the current time
//! - **Claimable**: `now > last_heartbeat + unlock_duration` (strict)
//! - **Claim**: beneficiary takes the balance; the sealed shares and payload
//!   reference are published in the audit log
//! - **Cancel**: owner destroys the vault and takes the balance back
//!
//! ```text
//!             heartbeat / fund / update (owner)
//!               +-----+
//!               v     |
//! create --> Active --+--- claim (beneficiary, after unlock) --> Claimed
//!               |
//!               +--- cancel (owner, any time) --> destroyed
//! ```
//!
//! Transitions live on [`Vault`] and are pure check-then-mutate functions.
//! [`VaultLedger`] hosts vaults, serialises transactions and keeps the
//! append-only audit log.

pub mod error;
pub mod events;
pub mod heartbeat;
pub mod ledger;
pub mod vault;

#[cfg(test)]
mod test_utils;

pub use error::{LedgerError, Role, VaultError};
pub use events::AuditEvent;
pub use heartbeat::{
    evaluate_batch, evaluate_heartbeat, HeartbeatAction, HeartbeatConfig, HeartbeatError,
    HeartbeatStatus,
};
pub use ledger::{
    Call, Clock, ManualClock, Receipt, SharedLedger, SystemClock, Transaction, VaultLedger,
};
pub use vault::{ClaimReceipt, Identity, NewVault, Vault, VaultId, VaultStatus};
