//! The vault entity and its transitions.
//!
//! Every transition checks authorization and preconditions first and only
//! then mutates, so a returned error means nothing changed.

use crate::error::{Role, VaultError};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-verified account identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque vault identifier, assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultId(String);

impl VaultId {
    /// 128 random bits, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VaultId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored lifecycle state. Claimability is derived, not stored; cancelled
/// vaults are destroyed rather than marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    Active,
    Claimed,
}

/// Creation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVault {
    pub beneficiary: Identity,
    pub unlock_duration_ms: u64,
    /// Blob id of the encrypted payload
    pub payload_reference: String,
    /// Wrapped shares, never raw ones
    pub share_records: Vec<String>,
    pub deposit: u64,
}

/// What a successful claim hands to the beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub vault_id: VaultId,
    pub beneficiary: Identity,
    pub amount: u64,
    pub share_records: Vec<String>,
    pub payload_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    id: VaultId,
    owner: Identity,
    beneficiary: Identity,
    unlock_duration_ms: u64,
    last_heartbeat_ms: u64,
    payload_reference: String,
    share_records: Vec<String>,
    balance: u64,
    status: VaultStatus,
    created_at_ms: u64,
}

impl Vault {
    /// Create an active vault owned by `owner` with `last_heartbeat = now`.
    ///
    /// # Errors
    /// - `InvalidUnlockDuration` if the duration is zero
    /// - `InvalidSharesCount` unless exactly `expected_shares` records are given
    pub fn create(
        id: VaultId,
        owner: Identity,
        params: NewVault,
        expected_shares: usize,
        now_ms: u64,
    ) -> Result<Self, VaultError> {
        if params.unlock_duration_ms == 0 {
            return Err(VaultError::InvalidUnlockDuration);
        }
        if params.share_records.len() != expected_shares {
            return Err(VaultError::InvalidSharesCount {
                expected: expected_shares,
                got: params.share_records.len(),
            });
        }

        Ok(Self {
            id,
            owner,
            beneficiary: params.beneficiary,
            unlock_duration_ms: params.unlock_duration_ms,
            last_heartbeat_ms: now_ms,
            payload_reference: params.payload_reference,
            share_records: params.share_records,
            balance: params.deposit,
            status: VaultStatus::Active,
            created_at_ms: now_ms,
        })
    }

    pub fn id(&self) -> &VaultId {
        &self.id
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn beneficiary(&self) -> &Identity {
        &self.beneficiary
    }

    pub fn unlock_duration_ms(&self) -> u64 {
        self.unlock_duration_ms
    }

    pub fn last_heartbeat_ms(&self) -> u64 {
        self.last_heartbeat_ms
    }

    pub fn payload_reference(&self) -> &str {
        &self.payload_reference
    }

    pub fn share_records(&self) -> &[String] {
        &self.share_records
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn status(&self) -> VaultStatus {
        self.status
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn is_claimed(&self) -> bool {
        self.status == VaultStatus::Claimed
    }

    /// The last locked instant. Saturates, so an enormous duration simply
    /// never unlocks.
    pub fn unlocks_at_ms(&self) -> u64 {
        self.last_heartbeat_ms
            .saturating_add(self.unlock_duration_ms)
    }

    /// True strictly after `last_heartbeat + unlock_duration`.
    pub fn is_claimable(&self, now_ms: u64) -> bool {
        self.status == VaultStatus::Active && now_ms > self.unlocks_at_ms()
    }

    /// `max(0, last_heartbeat + unlock_duration - now)`.
    ///
    /// Zero at the unlock instant itself; a claim needs one more millisecond.
    pub fn time_until_claimable(&self, now_ms: u64) -> u64 {
        self.unlocks_at_ms().saturating_sub(now_ms)
    }

    fn require(&self, caller: &Identity, role: Role) -> Result<(), VaultError> {
        let expected = match role {
            Role::Owner => &self.owner,
            Role::Beneficiary => &self.beneficiary,
        };
        if caller != expected {
            return Err(VaultError::Unauthorized { required: role });
        }
        Ok(())
    }

    fn require_active(&self) -> Result<(), VaultError> {
        match self.status {
            VaultStatus::Active => Ok(()),
            VaultStatus::Claimed => Err(VaultError::AlreadyClaimed),
        }
    }

    /// Owner liveness signal: `last_heartbeat = now`.
    pub fn heartbeat(&mut self, caller: &Identity, now_ms: u64) -> Result<(), VaultError> {
        self.require(caller, Role::Owner)?;
        self.require_active()?;
        if now_ms < self.last_heartbeat_ms {
            return Err(VaultError::StaleTimestamp {
                last_heartbeat: self.last_heartbeat_ms,
                now: now_ms,
            });
        }
        self.last_heartbeat_ms = now_ms;
        Ok(())
    }

    /// Beneficiary takes the whole balance once the vault is claimable.
    ///
    /// A zero balance is a valid, empty transfer.
    pub fn claim(&mut self, caller: &Identity, now_ms: u64) -> Result<ClaimReceipt, VaultError> {
        self.require(caller, Role::Beneficiary)?;
        self.require_active()?;
        if !self.is_claimable(now_ms) {
            return Err(VaultError::UnlockTimeNotReached {
                unlocks_after: self.unlocks_at_ms(),
            });
        }

        let amount = self.balance;
        self.balance = 0;
        self.status = VaultStatus::Claimed;

        Ok(ClaimReceipt {
            vault_id: self.id.clone(),
            beneficiary: self.beneficiary.clone(),
            amount,
            share_records: self.share_records.clone(),
            payload_reference: self.payload_reference.clone(),
        })
    }

    /// Owner withdraws everything. Returns the refunded amount; the host is
    /// responsible for destroying the vault afterwards.
    pub fn cancel(&mut self, caller: &Identity) -> Result<u64, VaultError> {
        self.require(caller, Role::Owner)?;
        self.require_active()?;
        let refund = self.balance;
        self.balance = 0;
        Ok(refund)
    }

    /// Returns the new balance.
    pub fn add_funds(&mut self, caller: &Identity, amount: u64) -> Result<u64, VaultError> {
        self.require(caller, Role::Owner)?;
        self.require_active()?;
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(VaultError::BalanceOverflow)?;
        Ok(self.balance)
    }

    pub fn update_beneficiary(
        &mut self,
        caller: &Identity,
        beneficiary: Identity,
    ) -> Result<(), VaultError> {
        self.require(caller, Role::Owner)?;
        self.require_active()?;
        self.beneficiary = beneficiary;
        Ok(())
    }

    /// Any positive duration is accepted, including one that makes the vault
    /// claimable immediately.
    pub fn update_unlock_duration(
        &mut self,
        caller: &Identity,
        unlock_duration_ms: u64,
    ) -> Result<(), VaultError> {
        self.require(caller, Role::Owner)?;
        self.require_active()?;
        if unlock_duration_ms == 0 {
            return Err(VaultError::InvalidUnlockDuration);
        }
        self.unlock_duration_ms = unlock_duration_ms;
        Ok(())
    }
}
