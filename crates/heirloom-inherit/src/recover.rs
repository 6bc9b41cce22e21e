//! Heir side: rebuild the key after a claim and decrypt the payload.

use crate::blob::BlobStore;
use crate::InheritError;
use heirloom_core::{decrypt_payload, CryptoError, ShareScheme};
use heirloom_shamir::{recover_key, threshold_subsets, unwrap_share, Share, WrappedShare};
use heirloom_vault::{AuditEvent, ClaimReceipt, VaultId};
use secp256k1::SecretKey;
use zeroize::Zeroizing;

/// Find the claim record for `vault_id` in an audit log.
pub fn published_claim(events: &[AuditEvent], vault_id: &VaultId) -> Option<ClaimReceipt> {
    events.iter().find_map(|event| match event {
        AuditEvent::VaultClaimed {
            vault_id: id,
            beneficiary,
            amount,
            share_records,
            payload_reference,
            ..
        } if id == vault_id => Some(ClaimReceipt {
            vault_id: id.clone(),
            beneficiary: beneficiary.clone(),
            amount: *amount,
            share_records: share_records.clone(),
            payload_reference: payload_reference.clone(),
        }),
        _ => None,
    })
}

/// Recover the inherited secret.
///
/// Uses the heir share, the public share if `public_share_id` is given and
/// still fetchable, and every ledger record from `claim` that unwraps with
/// `heir_secret`. Records that fail to unwrap are skipped, so a single
/// tampered record does not block recovery while enough others remain.
///
/// Threshold-sized subsets are tried in order, each built only when the
/// previous one failed, until one decrypts the payload.
pub fn recover_inheritance<S>(
    heir_share: &Share,
    public_share_id: Option<&str>,
    claim: &ClaimReceipt,
    heir_secret: &SecretKey,
    scheme: &ShareScheme,
    store: &S,
) -> Result<Zeroizing<Vec<u8>>, InheritError>
where
    S: BlobStore + ?Sized,
{
    scheme.validate()?;
    let mut shares = vec![heir_share.clone()];

    if let Some(id) = public_share_id {
        match store.get(id).map_err(InheritError::from).and_then(|bytes| {
            let bytes = Zeroizing::new(bytes);
            Share::from_bytes(&bytes).map_err(InheritError::from)
        }) {
            Ok(share) => push_unique(&mut shares, share),
            Err(e) => log::warn!("public share {} unusable: {}", id, e),
        }
    }

    for (i, record) in claim.share_records.iter().enumerate() {
        match unwrap_share(&WrappedShare::from(record.clone()), heir_secret) {
            Ok(share) => push_unique(&mut shares, share),
            Err(e) => log::warn!("[{}] share record {} unusable: {}", claim.vault_id, i, e),
        }
    }

    let threshold = scheme.threshold;
    if shares.len() < threshold as usize {
        return Err(InheritError::InsufficientShares {
            needed: threshold,
            got: shares.len(),
        });
    }

    let blob = store.get(&claim.payload_reference)?;

    for subset in threshold_subsets(shares.len(), threshold as usize) {
        let picked: Vec<Share> = subset.iter().map(|&i| shares[i].clone()).collect();
        let key = recover_key(&picked, scheme)?;
        match decrypt_payload(&blob, &key) {
            Ok(plaintext) => {
                log::info!("[{}] payload recovered", claim.vault_id);
                return Ok(Zeroizing::new(plaintext));
            }
            Err(CryptoError::DecryptionFailed) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(CryptoError::DecryptionFailed.into())
}

fn push_unique(shares: &mut Vec<Share>, share: Share) {
    if !shares.iter().any(|s| s.index == share.index) {
        shares.push(share);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::create::prepare_inheritance;
    use heirloom_core::RecipientKeypair;
    use heirloom_vault::Identity;

    fn claim_for(plan: &crate::InheritancePlan) -> ClaimReceipt {
        ClaimReceipt {
            vault_id: VaultId::from("v1"),
            beneficiary: Identity::new("heir"),
            amount: 0,
            share_records: plan
                .share_records
                .iter()
                .map(|w| w.as_str().to_string())
                .collect(),
            payload_reference: plan.payload_reference.clone(),
        }
    }

    #[test]
    fn test_recover_without_public_share() {
        let heir = RecipientKeypair::generate();
        let store = MemoryBlobStore::new();
        let scheme = ShareScheme::default();
        let plan = prepare_inheritance(b"the secret", &heir.public_key(), &scheme, &store).unwrap();

        let secret = recover_inheritance(
            &plan.heir_share,
            None,
            &claim_for(&plan),
            heir.secret_key(),
            &scheme,
            &store,
        )
        .unwrap();
        assert_eq!(&secret[..], b"the secret");
    }

    #[test]
    fn test_tolerates_tampered_record_with_public_share() {
        let heir = RecipientKeypair::generate();
        let store = MemoryBlobStore::new();
        let scheme = ShareScheme::default();
        let plan = prepare_inheritance(b"the secret", &heir.public_key(), &scheme, &store).unwrap();

        let mut claim = claim_for(&plan);
        let flipped = if &claim.share_records[0][100..102] == "00" { "ff" } else { "00" };
        claim.share_records[0].replace_range(100..102, flipped);
        claim.share_records[1] = "zz".into();

        let secret = recover_inheritance(
            &plan.heir_share,
            Some(&plan.public_share_id),
            &claim,
            heir.secret_key(),
            &scheme,
            &store,
        )
        .unwrap();
        assert_eq!(&secret[..], b"the secret");
    }

    #[test]
    fn test_wrong_heir_key_fails() {
        let heir = RecipientKeypair::generate();
        let impostor = RecipientKeypair::generate();
        let store = MemoryBlobStore::new();
        let scheme = ShareScheme::default();
        let plan = prepare_inheritance(b"the secret", &heir.public_key(), &scheme, &store).unwrap();

        let result = recover_inheritance(
            &plan.heir_share,
            Some(&plan.public_share_id),
            &claim_for(&plan),
            impostor.secret_key(),
            &scheme,
            &store,
        );
        assert!(matches!(
            result,
            Err(InheritError::InsufficientShares { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn test_missing_public_share_is_not_fatal() {
        let heir = RecipientKeypair::generate();
        let store = MemoryBlobStore::new();
        let scheme = ShareScheme::default();
        let plan = prepare_inheritance(b"abc", &heir.public_key(), &scheme, &store).unwrap();

        let absent = crate::content_id(b"never stored");
        let secret = recover_inheritance(
            &plan.heir_share,
            Some(&absent),
            &claim_for(&plan),
            heir.secret_key(),
            &scheme,
            &store,
        )
        .unwrap();
        assert_eq!(&secret[..], b"abc");
    }

    #[test]
    fn test_foreign_heir_share_fails_closed() {
        let heir = RecipientKeypair::generate();
        let store = MemoryBlobStore::new();
        let scheme = ShareScheme::default();
        let plan = prepare_inheritance(b"abc", &heir.public_key(), &scheme, &store).unwrap();
        let other = prepare_inheritance(b"xyz", &heir.public_key(), &scheme, &store).unwrap();

        // Only three shares available and one belongs to another split
        let mut claim = claim_for(&plan);
        claim.share_records.truncate(2);
        let result = recover_inheritance(
            &other.heir_share,
            None,
            &claim,
            heir.secret_key(),
            &scheme,
            &store,
        );
        assert!(matches!(
            result,
            Err(InheritError::Crypto(CryptoError::DecryptionFailed))
        ));
    }

    #[test]
    fn test_large_scheme_recovers_without_enumerating_subsets() {
        let heir = RecipientKeypair::generate();
        let store = MemoryBlobStore::new();
        let scheme = ShareScheme::new(10, 24).unwrap();
        let plan = prepare_inheritance(b"wide split", &heir.public_key(), &scheme, &store).unwrap();
        assert_eq!(plan.share_records.len(), 22);

        let secret = recover_inheritance(
            &plan.heir_share,
            Some(&plan.public_share_id),
            &claim_for(&plan),
            heir.secret_key(),
            &scheme,
            &store,
        )
        .unwrap();
        assert_eq!(&secret[..], b"wide split");
    }

    #[test]
    fn test_invalid_scheme_is_rejected_before_recovery() {
        let heir = RecipientKeypair::generate();
        let store = MemoryBlobStore::new();
        let plan =
            prepare_inheritance(b"abc", &heir.public_key(), &ShareScheme::default(), &store)
                .unwrap();

        let lowered = ShareScheme {
            total_shares: 5,
            threshold: 2,
        };
        let result = recover_inheritance(
            &plan.heir_share,
            Some(&plan.public_share_id),
            &claim_for(&plan),
            heir.secret_key(),
            &lowered,
            &store,
        );
        assert!(matches!(result, Err(InheritError::Scheme(_))));
    }

    #[test]
    fn test_published_claim_lookup() {
        let id = VaultId::from("v9");
        let events = vec![
            AuditEvent::Heartbeat {
                vault_id: id.clone(),
                owner: Identity::new("owner"),
                timestamp_ms: 1,
            },
            AuditEvent::VaultClaimed {
                vault_id: id.clone(),
                beneficiary: Identity::new("heir"),
                amount: 5,
                share_records: vec!["r".into()],
                payload_reference: "p".into(),
                timestamp_ms: 2,
            },
        ];
        let claim = published_claim(&events, &id).unwrap();
        assert_eq!(claim.amount, 5);
        assert_eq!(claim.payload_reference, "p");
        assert!(published_claim(&events, &VaultId::from("other")).is_none());
    }
}
