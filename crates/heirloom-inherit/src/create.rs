//! Owner side: turn a secret into everything a vault needs.

use crate::blob::BlobStore;
use crate::InheritError;
use heirloom_core::scheme::{HEIR_SHARE_SLOT, PUBLIC_SHARE_SLOT};
use heirloom_core::{encrypt_payload, generate_symmetric_key, ShareScheme};
use heirloom_shamir::{split_key, wrap_share, Share, WrappedShare};
use heirloom_vault::{Identity, NewVault};
use secp256k1::PublicKey;

/// Output of [`prepare_inheritance`].
///
/// The symmetric key itself is gone by the time this is returned; only its
/// shares survive.
#[derive(Debug)]
pub struct InheritancePlan {
    /// Give this to the heir privately. Never put it on the ledger.
    pub heir_share: Share,
    /// Blob id of the plaintext safety-net share
    pub public_share_id: String,
    /// Blob id of the encrypted payload
    pub payload_reference: String,
    /// Ledger shares, each wrapped for the heir
    pub share_records: Vec<WrappedShare>,
}

impl InheritancePlan {
    /// Creation parameters for a vault guarding this plan.
    pub fn vault_params(
        &self,
        beneficiary: Identity,
        unlock_duration_ms: u64,
        deposit: u64,
    ) -> NewVault {
        NewVault {
            beneficiary,
            unlock_duration_ms,
            payload_reference: self.payload_reference.clone(),
            share_records: self
                .share_records
                .iter()
                .map(|w| w.as_str().to_string())
                .collect(),
            deposit,
        }
    }
}

/// Encrypt `secret` under a fresh key and distribute the key's shares.
///
/// - slot 0 goes to the heir out of band
/// - slot 1 is stored in `store` as plaintext
/// - the remaining slots are wrapped for `heir` and end up on the vault
pub fn prepare_inheritance<S>(
    secret: &[u8],
    heir: &PublicKey,
    scheme: &ShareScheme,
    store: &S,
) -> Result<InheritancePlan, InheritError>
where
    S: BlobStore + ?Sized,
{
    scheme.validate()?;

    let key = generate_symmetric_key();
    let blob = encrypt_payload(secret, &key)?;
    let payload_reference = store.put(&blob)?;

    let shares = split_key(&key, scheme)?;
    drop(key);

    let share_records = shares[scheme.ledger_slots()]
        .iter()
        .map(|share| wrap_share(share, heir))
        .collect::<Result<Vec<_>, _>>()?;
    let public_share_id = store.put(&shares[PUBLIC_SHARE_SLOT].to_bytes())?;
    let heir_share = shares[HEIR_SHARE_SLOT].clone();

    log::info!(
        "prepared {}-of-{} inheritance: payload {}, {} ledger records",
        scheme.threshold,
        scheme.total_shares,
        payload_reference,
        share_records.len()
    );

    Ok(InheritancePlan {
        heir_share,
        public_share_id,
        payload_reference,
        share_records,
    })
}
