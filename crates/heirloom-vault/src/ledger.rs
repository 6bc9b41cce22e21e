//! Ledger host: owns vaults, serialises transitions and keeps the audit log.
//!
//! Each transition runs against a copy of the vault and is committed only if
//! it succeeds, so a failed call has no observable effect. Every commit bumps
//! the vault's version; callers may pin `expected_version` for
//! compare-and-swap semantics.
//!
//! [`SharedLedger`] puts the host behind a mutex and reads the clock inside
//! the critical section, so concurrent submissions are totally ordered and
//! timestamps follow commit order.

use crate::error::{LedgerError, VaultError};
use crate::events::AuditEvent;
use crate::vault::{ClaimReceipt, Identity, NewVault, Vault, VaultId};
use heirloom_core::ShareScheme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time source supplied by the host.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start_ms)))
    }

    pub fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// A requested transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    Create(NewVault),
    Heartbeat { vault_id: VaultId },
    Claim { vault_id: VaultId },
    Cancel { vault_id: VaultId },
    AddFunds { vault_id: VaultId, amount: u64 },
    UpdateBeneficiary { vault_id: VaultId, beneficiary: Identity },
    UpdateUnlockDuration { vault_id: VaultId, unlock_duration_ms: u64 },
}

impl Call {
    pub fn vault_id(&self) -> Option<&VaultId> {
        match self {
            Call::Create(_) => None,
            Call::Heartbeat { vault_id }
            | Call::Claim { vault_id }
            | Call::Cancel { vault_id }
            | Call::AddFunds { vault_id, .. }
            | Call::UpdateBeneficiary { vault_id, .. }
            | Call::UpdateUnlockDuration { vault_id, .. } => Some(vault_id),
        }
    }
}

/// A call plus the host-verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub caller: Identity,
    pub call: Call,
    /// Commit only if the vault is still at this version
    pub expected_version: Option<u64>,
}

impl Transaction {
    pub fn new(caller: Identity, call: Call) -> Self {
        Self {
            caller,
            call,
            expected_version: None,
        }
    }

    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Result of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Receipt {
    Created { vault_id: VaultId },
    Heartbeat { vault_id: VaultId, last_heartbeat_ms: u64 },
    Funded { vault_id: VaultId, balance: u64 },
    Updated { vault_id: VaultId },
    Claimed(ClaimReceipt),
    Cancelled { vault_id: VaultId, refunded: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultEntry {
    vault: Vault,
    version: u64,
}

/// What a successful transition commits besides the new vault state.
struct Outcome<T> {
    value: T,
    event: AuditEvent,
    credit: Option<(Identity, u64)>,
    destroy: bool,
}

impl<T> Outcome<T> {
    fn keep(value: T, event: AuditEvent) -> Self {
        Self {
            value,
            event,
            credit: None,
            destroy: false,
        }
    }
}

/// Full ledger state: vaults, audit log and credited payouts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultLedger {
    #[serde(default)]
    scheme: ShareScheme,
    #[serde(default)]
    vaults: BTreeMap<VaultId, VaultEntry>,
    #[serde(default)]
    events: Vec<AuditEvent>,
    /// Funds paid out by claims and cancellations, per identity
    #[serde(default)]
    credits: BTreeMap<Identity, u64>,
}

impl VaultLedger {
    pub fn new(scheme: ShareScheme) -> Self {
        Self {
            scheme,
            ..Self::default()
        }
    }

    /// Load state from file, or create an empty ledger if it does not exist
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let ledger: Self = serde_json::from_str(&contents)?;
        ledger.scheme.validate()?;
        Ok(ledger)
    }

    /// Save state to file.
    ///
    /// Writes a sibling temp file and renames it over `path`, so a crash
    /// leaves either the old state or the new one.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn scheme(&self) -> &ShareScheme {
        &self.scheme
    }

    pub fn vault(&self, vault_id: &VaultId) -> Result<&Vault, VaultError> {
        self.entry(vault_id).map(|e| &e.vault)
    }

    pub fn version(&self, vault_id: &VaultId) -> Result<u64, VaultError> {
        self.entry(vault_id).map(|e| e.version)
    }

    pub fn vaults(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.values().map(|e| &e.vault)
    }

    pub fn vault_ids(&self) -> Vec<VaultId> {
        self.vaults.keys().cloned().collect()
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn events_for(&self, vault_id: &VaultId) -> Vec<&AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.vault_id() == vault_id)
            .collect()
    }

    /// Total paid out to `identity` so far.
    pub fn credited(&self, identity: &Identity) -> u64 {
        self.credits.get(identity).copied().unwrap_or(0)
    }

    pub fn is_claimable(&self, vault_id: &VaultId, now_ms: u64) -> Result<bool, VaultError> {
        Ok(self.vault(vault_id)?.is_claimable(now_ms))
    }

    pub fn time_until_claimable(&self, vault_id: &VaultId, now_ms: u64) -> Result<u64, VaultError> {
        Ok(self.vault(vault_id)?.time_until_claimable(now_ms))
    }

    fn entry(&self, vault_id: &VaultId) -> Result<&VaultEntry, VaultError> {
        self.vaults
            .get(vault_id)
            .ok_or_else(|| VaultError::VaultNotFound(vault_id.clone()))
    }

    /// Apply a transaction at host time `now_ms`.
    pub fn submit(&mut self, tx: Transaction, now_ms: u64) -> Result<Receipt, VaultError> {
        if let (Some(vault_id), Some(expected)) = (tx.call.vault_id(), tx.expected_version) {
            let actual = self.version(vault_id)?;
            if actual != expected {
                log::warn!(
                    "[{}] rejected: version {} != expected {}",
                    vault_id,
                    actual,
                    expected
                );
                return Err(VaultError::VersionConflict { expected, actual });
            }
        }

        let caller = &tx.caller;
        match tx.call {
            Call::Create(params) => self
                .create_vault(caller, params, now_ms)
                .map(|vault_id| Receipt::Created { vault_id }),
            Call::Heartbeat { vault_id } => self
                .heartbeat(caller, &vault_id, now_ms)
                .map(|last_heartbeat_ms| Receipt::Heartbeat {
                    vault_id,
                    last_heartbeat_ms,
                }),
            Call::Claim { vault_id } => self.claim(caller, &vault_id, now_ms).map(Receipt::Claimed),
            Call::Cancel { vault_id } => self
                .cancel(caller, &vault_id, now_ms)
                .map(|refunded| Receipt::Cancelled { vault_id, refunded }),
            Call::AddFunds { vault_id, amount } => self
                .add_funds(caller, &vault_id, amount, now_ms)
                .map(|balance| Receipt::Funded { vault_id, balance }),
            Call::UpdateBeneficiary {
                vault_id,
                beneficiary,
            } => self
                .update_beneficiary(caller, &vault_id, beneficiary, now_ms)
                .map(|()| Receipt::Updated { vault_id }),
            Call::UpdateUnlockDuration {
                vault_id,
                unlock_duration_ms,
            } => self
                .update_unlock_duration(caller, &vault_id, unlock_duration_ms, now_ms)
                .map(|()| Receipt::Updated { vault_id }),
        }
    }

    pub fn create_vault(
        &mut self,
        owner: &Identity,
        params: NewVault,
        now_ms: u64,
    ) -> Result<VaultId, VaultError> {
        let mut vault_id = VaultId::generate();
        while self.vaults.contains_key(&vault_id) {
            vault_id = VaultId::generate();
        }

        let vault = Vault::create(
            vault_id.clone(),
            owner.clone(),
            params,
            self.scheme.ledger_shares(),
            now_ms,
        )
        .inspect_err(|e| log::warn!("create by {} rejected: {}", owner, e))?;

        log::info!(
            "[{}] created by {} for {}: unlock {} ms, deposit {}",
            vault_id,
            owner,
            vault.beneficiary(),
            vault.unlock_duration_ms(),
            vault.balance()
        );

        self.events.push(AuditEvent::VaultCreated {
            vault_id: vault_id.clone(),
            owner: owner.clone(),
            beneficiary: vault.beneficiary().clone(),
            unlock_duration_ms: vault.unlock_duration_ms(),
            deposit: vault.balance(),
            timestamp_ms: now_ms,
        });
        self.vaults
            .insert(vault_id.clone(), VaultEntry { vault, version: 0 });
        Ok(vault_id)
    }

    /// Returns the new `last_heartbeat`.
    pub fn heartbeat(
        &mut self,
        caller: &Identity,
        vault_id: &VaultId,
        now_ms: u64,
    ) -> Result<u64, VaultError> {
        self.transition(vault_id, "heartbeat", |vault| {
            vault.heartbeat(caller, now_ms)?;
            log::debug!("[{}] heartbeat at {}", vault.id(), now_ms);
            Ok(Outcome::keep(
                now_ms,
                AuditEvent::Heartbeat {
                    vault_id: vault.id().clone(),
                    owner: caller.clone(),
                    timestamp_ms: now_ms,
                },
            ))
        })
    }

    pub fn claim(
        &mut self,
        caller: &Identity,
        vault_id: &VaultId,
        now_ms: u64,
    ) -> Result<ClaimReceipt, VaultError> {
        self.transition(vault_id, "claim", |vault| {
            let receipt = vault.claim(caller, now_ms)?;
            log::info!(
                "[{}] claimed by {}: {} transferred",
                vault.id(),
                caller,
                receipt.amount
            );
            let event = AuditEvent::VaultClaimed {
                vault_id: receipt.vault_id.clone(),
                beneficiary: receipt.beneficiary.clone(),
                amount: receipt.amount,
                share_records: receipt.share_records.clone(),
                payload_reference: receipt.payload_reference.clone(),
                timestamp_ms: now_ms,
            };
            Ok(Outcome {
                credit: Some((receipt.beneficiary.clone(), receipt.amount)),
                value: receipt,
                event,
                destroy: false,
            })
        })
    }

    /// Destroys the vault and returns the refunded balance.
    pub fn cancel(
        &mut self,
        caller: &Identity,
        vault_id: &VaultId,
        now_ms: u64,
    ) -> Result<u64, VaultError> {
        self.transition(vault_id, "cancel", |vault| {
            let refunded = vault.cancel(caller)?;
            log::info!("[{}] cancelled by owner: {} refunded", vault.id(), refunded);
            Ok(Outcome {
                value: refunded,
                event: AuditEvent::VaultCancelled {
                    vault_id: vault.id().clone(),
                    owner: caller.clone(),
                    refunded,
                    timestamp_ms: now_ms,
                },
                credit: Some((caller.clone(), refunded)),
                destroy: true,
            })
        })
    }

    /// Returns the new balance.
    pub fn add_funds(
        &mut self,
        caller: &Identity,
        vault_id: &VaultId,
        amount: u64,
        now_ms: u64,
    ) -> Result<u64, VaultError> {
        self.transition(vault_id, "add_funds", |vault| {
            let balance = vault.add_funds(caller, amount)?;
            log::debug!("[{}] funded +{} -> {}", vault.id(), amount, balance);
            Ok(Outcome::keep(
                balance,
                AuditEvent::FundsAdded {
                    vault_id: vault.id().clone(),
                    owner: caller.clone(),
                    amount,
                    balance,
                    timestamp_ms: now_ms,
                },
            ))
        })
    }

    pub fn update_beneficiary(
        &mut self,
        caller: &Identity,
        vault_id: &VaultId,
        beneficiary: Identity,
        now_ms: u64,
    ) -> Result<(), VaultError> {
        self.transition(vault_id, "update_beneficiary", |vault| {
            vault.update_beneficiary(caller, beneficiary.clone())?;
            log::debug!("[{}] beneficiary -> {}", vault.id(), beneficiary);
            Ok(Outcome::keep(
                (),
                AuditEvent::BeneficiaryUpdated {
                    vault_id: vault.id().clone(),
                    owner: caller.clone(),
                    beneficiary,
                    timestamp_ms: now_ms,
                },
            ))
        })
    }

    pub fn update_unlock_duration(
        &mut self,
        caller: &Identity,
        vault_id: &VaultId,
        unlock_duration_ms: u64,
        now_ms: u64,
    ) -> Result<(), VaultError> {
        self.transition(vault_id, "update_unlock_duration", |vault| {
            vault.update_unlock_duration(caller, unlock_duration_ms)?;
            log::debug!("[{}] unlock duration -> {} ms", vault.id(), unlock_duration_ms);
            Ok(Outcome::keep(
                (),
                AuditEvent::UnlockDurationUpdated {
                    vault_id: vault.id().clone(),
                    owner: caller.clone(),
                    unlock_duration_ms,
                    timestamp_ms: now_ms,
                },
            ))
        })
    }

    /// Run `apply` on a copy of the vault and commit only on success.
    fn transition<T, F>(
        &mut self,
        vault_id: &VaultId,
        op: &'static str,
        apply: F,
    ) -> Result<T, VaultError>
    where
        F: FnOnce(&mut Vault) -> Result<Outcome<T>, VaultError>,
    {
        let entry = self.entry(vault_id)?;
        let mut draft = entry.vault.clone();
        let version = entry.version;

        let outcome = apply(&mut draft)
            .inspect_err(|e| log::warn!("[{}] {} rejected: {}", vault_id, op, e))?;

        // Everything fallible happens before the first write.
        let credit = match &outcome.credit {
            Some((who, amount)) => {
                let total = self
                    .credited(who)
                    .checked_add(*amount)
                    .ok_or(VaultError::BalanceOverflow)?;
                Some((who.clone(), total))
            }
            None => None,
        };

        if outcome.destroy {
            self.vaults.remove(vault_id);
        } else {
            self.vaults.insert(
                vault_id.clone(),
                VaultEntry {
                    vault: draft,
                    version: version + 1,
                },
            );
        }
        if let Some((who, total)) = credit {
            self.credits.insert(who, total);
        }
        self.events.push(outcome.event);

        Ok(outcome.value)
    }
}

/// A ledger shared between threads. Clones refer to the same ledger.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<VaultLedger>>,
    clock: Arc<dyn Clock>,
}

impl SharedLedger {
    pub fn new(ledger: VaultLedger, clock: impl Clock + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            clock: Arc::new(clock),
        }
    }

    // Transitions commit all-or-nothing, so state behind a poisoned lock is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, VaultLedger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn submit(&self, tx: Transaction) -> Result<Receipt, VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.submit(tx, now)
    }

    pub fn create_vault(&self, owner: &Identity, params: NewVault) -> Result<VaultId, VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.create_vault(owner, params, now)
    }

    pub fn heartbeat(&self, caller: &Identity, vault_id: &VaultId) -> Result<u64, VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.heartbeat(caller, vault_id, now)
    }

    pub fn claim(&self, caller: &Identity, vault_id: &VaultId) -> Result<ClaimReceipt, VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.claim(caller, vault_id, now)
    }

    pub fn cancel(&self, caller: &Identity, vault_id: &VaultId) -> Result<u64, VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.cancel(caller, vault_id, now)
    }

    pub fn add_funds(
        &self,
        caller: &Identity,
        vault_id: &VaultId,
        amount: u64,
    ) -> Result<u64, VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.add_funds(caller, vault_id, amount, now)
    }

    pub fn update_beneficiary(
        &self,
        caller: &Identity,
        vault_id: &VaultId,
        beneficiary: Identity,
    ) -> Result<(), VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.update_beneficiary(caller, vault_id, beneficiary, now)
    }

    pub fn update_unlock_duration(
        &self,
        caller: &Identity,
        vault_id: &VaultId,
        unlock_duration_ms: u64,
    ) -> Result<(), VaultError> {
        let mut ledger = self.lock();
        let now = self.clock.now_ms();
        ledger.update_unlock_duration(caller, vault_id, unlock_duration_ms, now)
    }

    pub fn vault(&self, vault_id: &VaultId) -> Result<Vault, VaultError> {
        self.lock().vault(vault_id).cloned()
    }

    pub fn is_claimable(&self, vault_id: &VaultId) -> Result<bool, VaultError> {
        let ledger = self.lock();
        ledger.is_claimable(vault_id, self.clock.now_ms())
    }

    pub fn time_until_claimable(&self, vault_id: &VaultId) -> Result<u64, VaultError> {
        let ledger = self.lock();
        ledger.time_until_claimable(vault_id, self.clock.now_ms())
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.lock().events().to_vec()
    }

    pub fn events_for(&self, vault_id: &VaultId) -> Vec<AuditEvent> {
        self.lock()
            .events_for(vault_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn credited(&self, identity: &Identity) -> u64 {
        self.lock().credited(identity)
    }

    /// Point-in-time copy of the whole ledger.
    pub fn snapshot(&self) -> VaultLedger {
        self.lock().clone()
    }

    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        self.lock().save(path)
    }
}
