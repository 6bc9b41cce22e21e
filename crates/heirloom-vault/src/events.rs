//! Audit events appended by the ledger on every committed transition

use crate::vault::{Identity, VaultId};
use serde::{Deserialize, Serialize};

/// One entry of the append-only audit log.
///
/// `VaultClaimed` is the only channel through which the wrapped shares and
/// payload reference leave the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEvent {
    VaultCreated {
        vault_id: VaultId,
        owner: Identity,
        beneficiary: Identity,
        unlock_duration_ms: u64,
        deposit: u64,
        timestamp_ms: u64,
    },

    Heartbeat {
        vault_id: VaultId,
        owner: Identity,
        timestamp_ms: u64,
    },

    FundsAdded {
        vault_id: VaultId,
        owner: Identity,
        amount: u64,
        balance: u64,
        timestamp_ms: u64,
    },

    BeneficiaryUpdated {
        vault_id: VaultId,
        owner: Identity,
        beneficiary: Identity,
        timestamp_ms: u64,
    },

    UnlockDurationUpdated {
        vault_id: VaultId,
        owner: Identity,
        unlock_duration_ms: u64,
        timestamp_ms: u64,
    },

    VaultClaimed {
        vault_id: VaultId,
        beneficiary: Identity,
        amount: u64,
        share_records: Vec<String>,
        payload_reference: String,
        timestamp_ms: u64,
    },

    VaultCancelled {
        vault_id: VaultId,
        owner: Identity,
        refunded: u64,
        timestamp_ms: u64,
    },
}

impl AuditEvent {
    pub fn vault_id(&self) -> &VaultId {
        match self {
            AuditEvent::VaultCreated { vault_id, .. }
            | AuditEvent::Heartbeat { vault_id, .. }
            | AuditEvent::FundsAdded { vault_id, .. }
            | AuditEvent::BeneficiaryUpdated { vault_id, .. }
            | AuditEvent::UnlockDurationUpdated { vault_id, .. }
            | AuditEvent::VaultClaimed { vault_id, .. }
            | AuditEvent::VaultCancelled { vault_id, .. } => vault_id,
        }
    }

    /// The identity that submitted the transition.
    pub fn actor(&self) -> &Identity {
        match self {
            AuditEvent::VaultClaimed { beneficiary, .. } => beneficiary,
            AuditEvent::VaultCreated { owner, .. }
            | AuditEvent::Heartbeat { owner, .. }
            | AuditEvent::FundsAdded { owner, .. }
            | AuditEvent::BeneficiaryUpdated { owner, .. }
            | AuditEvent::UnlockDurationUpdated { owner, .. }
            | AuditEvent::VaultCancelled { owner, .. } => owner,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            AuditEvent::VaultCreated { timestamp_ms, .. }
            | AuditEvent::Heartbeat { timestamp_ms, .. }
            | AuditEvent::FundsAdded { timestamp_ms, .. }
            | AuditEvent::BeneficiaryUpdated { timestamp_ms, .. }
            | AuditEvent::UnlockDurationUpdated { timestamp_ms, .. }
            | AuditEvent::VaultClaimed { timestamp_ms, .. }
            | AuditEvent::VaultCancelled { timestamp_ms, .. } => *timestamp_ms,
        }
    }

    /// Check if this event ends the vault's life
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuditEvent::VaultClaimed { .. } | AuditEvent::VaultCancelled { .. }
        )
    }
}
