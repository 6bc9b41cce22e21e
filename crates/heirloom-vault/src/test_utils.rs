//! Shared test fixtures for heirloom-vault tests.

use crate::vault::{Identity, NewVault, Vault, VaultId};

pub const DAY_MS: u64 = 86_400_000;

pub fn owner() -> Identity {
    Identity::new("owner-account")
}

pub fn heir() -> Identity {
    Identity::new("heir-account")
}

pub fn stranger() -> Identity {
    Identity::new("stranger-account")
}

/// Three placeholder wrapped-share records.
pub fn test_records() -> Vec<String> {
    (3..=5).map(|i| format!("01{:02x}sealed", i)).collect()
}

pub fn new_vault_params(unlock_duration_ms: u64) -> NewVault {
    NewVault {
        beneficiary: heir(),
        unlock_duration_ms,
        payload_reference: "blob-payload".to_string(),
        share_records: test_records(),
        deposit: 1_000_000_000,
    }
}

/// Active vault owned by [`owner`] for [`heir`], funded with 1e9 units.
pub fn make_test_vault(unlock_duration_ms: u64, created_at_ms: u64) -> Vault {
    Vault::create(
        VaultId::generate(),
        owner(),
        new_vault_params(unlock_duration_ms),
        3,
        created_at_ms,
    )
    .unwrap()
}
