//! Heartbeat evaluation for vaults.
//!
//! Pure logic with no I/O. Takes a vault and the current time and returns a
//! recommendation; the caller (monitor daemon, wallet UI) decides whether to
//! act on it.
//!
//! ```text
//! |--- Healthy ---|--- CheckinRecommended ---|--- CheckinRequired ---|--- Claimable
//! 0%             50%                        90%                    100%
//! ```
//!
//! Thresholds are configurable. `Claimable` begins strictly after 100%, in
//! step with [`Vault::is_claimable`].

use crate::vault::{Vault, VaultId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// When to recommend a check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Fraction of the unlock duration elapsed before recommending a
    /// check-in. Default: 0.5.
    pub checkin_threshold: f64,

    /// Fraction elapsed before a check-in is critical. Default: 0.9.
    pub critical_threshold: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            checkin_threshold: 0.5,
            critical_threshold: 0.9,
        }
    }
}

impl HeartbeatConfig {
    /// Validate that thresholds are sensible.
    pub fn validate(&self) -> Result<(), HeartbeatError> {
        if self.checkin_threshold <= 0.0 || self.checkin_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "checkin_threshold must be between 0.0 and 1.0 exclusive".into(),
            ));
        }
        if self.critical_threshold <= self.checkin_threshold || self.critical_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "critical_threshold must be between checkin_threshold and 1.0 exclusive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}

/// What the heartbeat recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatAction {
    Healthy,
    CheckinRecommended,
    /// Must check in now.
    CheckinRequired,
    /// The beneficiary can claim. Too late for a check-in to matter if they
    /// act first.
    Claimable,
    Claimed,
}

impl HeartbeatAction {
    /// Lower is more urgent.
    fn priority(self) -> u8 {
        match self {
            HeartbeatAction::Claimable => 0,
            HeartbeatAction::CheckinRequired => 1,
            HeartbeatAction::CheckinRecommended => 2,
            HeartbeatAction::Healthy => 3,
            HeartbeatAction::Claimed => 4,
        }
    }
}

/// Heartbeat status of one vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    pub vault_id: VaultId,
    /// Fraction of the unlock duration elapsed (0.0 upwards, may exceed 1.0)
    pub elapsed_fraction: f64,
    pub remaining_ms: u64,
    pub action: HeartbeatAction,
}

pub fn evaluate_heartbeat(vault: &Vault, now_ms: u64, config: &HeartbeatConfig) -> HeartbeatStatus {
    let elapsed = now_ms.saturating_sub(vault.last_heartbeat_ms());
    let elapsed_fraction = elapsed as f64 / vault.unlock_duration_ms().max(1) as f64;

    let action = if vault.is_claimed() {
        HeartbeatAction::Claimed
    } else if vault.is_claimable(now_ms) {
        HeartbeatAction::Claimable
    } else if elapsed_fraction >= config.critical_threshold {
        HeartbeatAction::CheckinRequired
    } else if elapsed_fraction >= config.checkin_threshold {
        HeartbeatAction::CheckinRecommended
    } else {
        HeartbeatAction::Healthy
    };

    HeartbeatStatus {
        vault_id: vault.id().clone(),
        elapsed_fraction,
        remaining_ms: vault.time_until_claimable(now_ms),
        action,
    }
}

/// Batch evaluate heartbeat for multiple vaults.
///
/// Returns statuses sorted by urgency (most urgent first), ties broken by
/// elapsed fraction.
pub fn evaluate_batch<'a, I>(vaults: I, now_ms: u64, config: &HeartbeatConfig) -> Vec<HeartbeatStatus>
where
    I: IntoIterator<Item = &'a Vault>,
{
    let mut statuses: Vec<HeartbeatStatus> = vaults
        .into_iter()
        .map(|vault| evaluate_heartbeat(vault, now_ms, config))
        .collect();

    statuses.sort_by(|a, b| {
        a.action.priority().cmp(&b.action.priority()).then(
            a.elapsed_fraction
                .partial_cmp(&b.elapsed_fraction)
                .unwrap_or(Ordering::Equal)
                .reverse(),
        )
    });

    statuses
}
