//! Vault lifecycle through the shared ledger host.
//!
//! Covers the unlock boundary, role gating, funding, persistence and
//! concurrent heartbeat/claim races.

use heirloom_core::ShareScheme;
use heirloom_vault::{
    AuditEvent, Call, HeartbeatAction, HeartbeatConfig, Identity, ManualClock, NewVault, Receipt,
    Role, SharedLedger, Transaction, VaultError, VaultId, VaultLedger,
};
use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

const DAY_MS: u64 = 86_400_000;
const DEPOSIT: u64 = 1_000_000_000;

fn owner() -> Identity {
    Identity::new("owner-account")
}

fn heir() -> Identity {
    Identity::new("heir-account")
}

fn params(unlock_duration_ms: u64) -> NewVault {
    NewVault {
        beneficiary: heir(),
        unlock_duration_ms,
        payload_reference: "payload-blob".into(),
        share_records: vec!["r3".into(), "r4".into(), "r5".into()],
        deposit: DEPOSIT,
    }
}

fn setup(start_ms: u64, unlock_duration_ms: u64) -> (SharedLedger, ManualClock, VaultId) {
    let clock = ManualClock::new(start_ms);
    let ledger = SharedLedger::new(VaultLedger::new(ShareScheme::default()), clock.clone());
    let id = ledger.create_vault(&owner(), params(unlock_duration_ms)).unwrap();
    (ledger, clock, id)
}

#[test]
fn test_heartbeat_then_claim_scenario() {
    let (ledger, clock, id) = setup(1_000, DAY_MS);

    clock.set(50_000);
    ledger.heartbeat(&owner(), &id).unwrap();

    clock.set(52_000);
    assert_eq!(
        ledger.claim(&heir(), &id).unwrap_err(),
        VaultError::UnlockTimeNotReached {
            unlocks_after: 50_000 + DAY_MS
        }
    );

    clock.set(50_000 + DAY_MS);
    assert!(ledger.claim(&heir(), &id).is_err());

    clock.set(50_000 + DAY_MS + 1);
    let receipt = ledger.claim(&heir(), &id).unwrap();
    assert_eq!(receipt.amount, DEPOSIT);
    assert_eq!(receipt.share_records.len(), 3);
    assert_eq!(ledger.vault(&id).unwrap().balance(), 0);
    assert_eq!(ledger.credited(&heir()), DEPOSIT);

    // Second claim fails
    assert_eq!(
        ledger.claim(&heir(), &id).unwrap_err(),
        VaultError::AlreadyClaimed
    );
}

#[test]
fn test_roles_are_enforced() {
    let (ledger, clock, id) = setup(0, DAY_MS);
    clock.set(DAY_MS * 2);

    assert_eq!(
        ledger.heartbeat(&heir(), &id).unwrap_err(),
        VaultError::Unauthorized {
            required: Role::Owner
        }
    );
    assert_eq!(
        ledger.claim(&owner(), &id).unwrap_err(),
        VaultError::Unauthorized {
            required: Role::Beneficiary
        }
    );
    assert!(ledger.cancel(&heir(), &id).unwrap_err().is_unauthorized());
    assert!(ledger.add_funds(&heir(), &id, 1).unwrap_err().is_unauthorized());

    // Nothing above left a trace
    assert_eq!(ledger.events_for(&id).len(), 1);
}

#[test]
fn test_funding_and_updates_before_claim() {
    let (ledger, clock, id) = setup(0, DAY_MS);

    assert_eq!(ledger.add_funds(&owner(), &id, 500).unwrap(), DEPOSIT + 500);
    assert_eq!(
        ledger.add_funds(&owner(), &id, u64::MAX).unwrap_err(),
        VaultError::BalanceOverflow
    );

    let new_heir = Identity::new("second-heir");
    ledger
        .update_beneficiary(&owner(), &id, new_heir.clone())
        .unwrap();
    ledger.update_unlock_duration(&owner(), &id, 10).unwrap();

    clock.set(11);
    assert!(ledger.claim(&heir(), &id).unwrap_err().is_unauthorized());
    let receipt = ledger.claim(&new_heir, &id).unwrap();
    assert_eq!(receipt.amount, DEPOSIT + 500);
}

#[test]
fn test_heartbeat_after_claim_fails() {
    let (ledger, clock, id) = setup(0, 100);
    clock.set(101);
    ledger.claim(&heir(), &id).unwrap();
    assert_eq!(
        ledger.heartbeat(&owner(), &id).unwrap_err(),
        VaultError::AlreadyClaimed
    );
    assert_eq!(
        ledger.cancel(&owner(), &id).unwrap_err(),
        VaultError::AlreadyClaimed
    );
}

#[test]
fn test_audit_log_order() {
    let (ledger, clock, id) = setup(0, 100);
    clock.set(50);
    ledger.heartbeat(&owner(), &id).unwrap();
    clock.set(151);
    ledger.claim(&heir(), &id).unwrap();

    let events = ledger.events_for(&id);
    assert!(matches!(events[0], AuditEvent::VaultCreated { .. }));
    assert!(matches!(events[1], AuditEvent::Heartbeat { timestamp_ms: 50, .. }));
    assert!(matches!(events[2], AuditEvent::VaultClaimed { timestamp_ms: 151, .. }));
    let stamps: Vec<u64> = events.iter().map(|e| e.timestamp_ms()).collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_monitor_view_from_snapshot() {
    let (ledger, clock, id) = setup(0, 1_000);
    clock.set(950);

    let snapshot = ledger.snapshot();
    let statuses = heirloom_vault::evaluate_batch(
        snapshot.vaults(),
        ledger.now_ms(),
        &HeartbeatConfig::default(),
    );
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].vault_id, id);
    assert_eq!(statuses[0].action, HeartbeatAction::CheckinRequired);
}

#[test]
fn test_persist_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let (ledger, clock, id) = setup(1_000, DAY_MS);
    clock.set(2_000);
    ledger.heartbeat(&owner(), &id).unwrap();
    ledger.save(&path).unwrap();

    let reloaded = VaultLedger::load(&path).unwrap();
    let clock = ManualClock::new(2_000 + DAY_MS + 1);
    let ledger = SharedLedger::new(reloaded, clock);
    let receipt = ledger.claim(&heir(), &id).unwrap();
    assert_eq!(receipt.amount, DEPOSIT);
    assert_eq!(ledger.events_for(&id).len(), 3);
}

#[test]
fn test_concurrent_heartbeat_and_claim_are_serialised() {
    for _ in 0..50 {
        let (ledger, clock, id) = setup(0, 100);
        // Exactly at the boundary a heartbeat still wins; one tick later the
        // two calls genuinely race.
        clock.set(101);

        let barrier = Arc::new(Barrier::new(2));
        let owner_side = {
            let ledger = ledger.clone();
            let barrier = barrier.clone();
            let id = id.clone();
            thread::spawn(move || {
                barrier.wait();
                ledger.heartbeat(&owner(), &id)
            })
        };
        let heir_side = {
            let ledger = ledger.clone();
            let barrier = barrier.clone();
            let id = id.clone();
            thread::spawn(move || {
                barrier.wait();
                ledger.claim(&heir(), &id)
            })
        };

        let heartbeat = owner_side.join().unwrap();
        let claim = heir_side.join().unwrap();
        let vault = ledger.vault(&id).unwrap();

        match (heartbeat, claim) {
            // Heartbeat first: claim sees a fresh heartbeat and fails
            (Ok(_), Err(VaultError::UnlockTimeNotReached { .. })) => {
                assert!(!vault.is_claimed());
                assert_eq!(vault.balance(), DEPOSIT);
                assert_eq!(ledger.credited(&heir()), 0);
            }
            // Claim first: heartbeat finds a claimed vault
            (Err(VaultError::AlreadyClaimed), Ok(receipt)) => {
                assert!(vault.is_claimed());
                assert_eq!(receipt.amount, DEPOSIT);
                assert_eq!(ledger.credited(&heir()), DEPOSIT);
            }
            other => panic!("inconsistent outcome: {:?}", other),
        }
    }
}

#[test]
fn test_pinned_versions_detect_lost_updates() {
    let (ledger, _clock, id) = setup(0, DAY_MS);

    let first = Transaction::new(
        owner(),
        Call::AddFunds {
            vault_id: id.clone(),
            amount: 1,
        },
    )
    .with_expected_version(0);
    let second = first.clone();

    assert!(matches!(
        ledger.submit(first).unwrap(),
        Receipt::Funded { balance, .. } if balance == DEPOSIT + 1
    ));
    assert_eq!(
        ledger.submit(second).unwrap_err(),
        VaultError::VersionConflict {
            expected: 0,
            actual: 1
        }
    );
    assert_eq!(ledger.vault(&id).unwrap().balance(), DEPOSIT + 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Claimable exactly when now > last_heartbeat + unlock_duration.
    #[test]
    fn prop_claim_boundary(
        start in 0u64..1_000_000,
        duration in 1u64..10_000_000,
        offset in 0u64..20_000_000,
    ) {
        let (ledger, clock, id) = setup(start, duration);
        let now = start + offset;
        clock.set(now);

        let result = ledger.claim(&heir(), &id);
        if now > start + duration {
            prop_assert_eq!(result.unwrap().amount, DEPOSIT);
        } else {
            prop_assert_eq!(
                result.unwrap_err(),
                VaultError::UnlockTimeNotReached { unlocks_after: start + duration }
            );
            prop_assert_eq!(ledger.time_until_claimable(&id).unwrap(), start + duration - now);
        }
    }

    /// No sequence of owner heartbeats lets the heir claim early.
    #[test]
    fn prop_heartbeats_postpone_claim(
        duration in 10u64..1_000_000,
        gaps in prop::collection::vec(0u64..1_000_000, 1..10),
    ) {
        let (ledger, clock, id) = setup(0, duration);
        let mut now = 0u64;
        for gap in gaps {
            // Owner checks in before the deadline every time
            now += gap % duration;
            clock.set(now);
            ledger.heartbeat(&owner(), &id).unwrap();
            prop_assert!(!ledger.is_claimable(&id).unwrap());
            prop_assert!(ledger.claim(&heir(), &id).is_err());
        }
        clock.set(now + duration + 1);
        prop_assert!(ledger.claim(&heir(), &id).is_ok());
    }

    /// Strangers can never move a vault.
    #[test]
    fn prop_stranger_has_no_power(name in "[a-z]{1,12}", at in 0u64..u64::MAX / 2) {
        let stranger = Identity::new(format!("{}-x", name));
        let (ledger, clock, id) = setup(0, 1);
        clock.set(at);

        prop_assert!(ledger.heartbeat(&stranger, &id).unwrap_err().is_unauthorized());
        prop_assert!(ledger.claim(&stranger, &id).unwrap_err().is_unauthorized());
        prop_assert!(ledger.cancel(&stranger, &id).unwrap_err().is_unauthorized());
        prop_assert_eq!(ledger.events_for(&id).len(), 1);
    }
}
