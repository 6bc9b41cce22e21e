//! Core Shamir's Secret Sharing implementation
//!
//! Split a secret into N shares where any M can reconstruct it and any
//! M-1 reveal nothing. Each byte of the secret gets its own random
//! polynomial of degree M-1 over GF(256).

use crate::gf256::{lagrange_interpolate, poly_eval};
use crate::ShamirError;
use heirloom_core::{ShareScheme, SymmetricKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A single share of a secret. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    /// Share index (1..=N, never 0)
    pub index: u8,
    /// Share data (same length as original secret)
    pub data: Vec<u8>,
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Share({}, <redacted>)", self.index)
    }
}

impl Share {
    /// Encode as `index || data`.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(1 + self.data.len()));
        bytes.push(self.index);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ShamirError> {
        match bytes.split_first() {
            Some((&0, _)) => Err(ShamirError::InvalidShare("Share index 0".into())),
            Some((&index, data)) if !data.is_empty() => Ok(Self {
                index,
                data: data.to_vec(),
            }),
            _ => Err(ShamirError::InvalidShare("Share too short".into())),
        }
    }
}

/// Split a secret into shares using Shamir's Secret Sharing
///
/// # Arguments
/// * `secret` - The secret bytes to split
/// * `threshold` - Minimum shares needed to reconstruct (M)
/// * `total` - Total shares to generate (N)
///
/// # Returns
/// Vector of N shares with indices 1..=N, any M of which reconstruct the secret
pub fn split_secret(secret: &[u8], threshold: u8, total: u8) -> Result<Vec<Share>, ShamirError> {
    if threshold < 2 {
        return Err(ShamirError::InvalidThreshold);
    }
    if threshold > total {
        return Err(ShamirError::ThresholdExceedsShares);
    }
    if secret.is_empty() {
        return Err(ShamirError::InvalidShare("Empty secret".into()));
    }

    let mut shares: Vec<Share> = (1..=total)
        .map(|i| Share {
            index: i,
            data: Vec::with_capacity(secret.len()),
        })
        .collect();

    // p(x) = secret + c1*x + ... + c_{t-1}*x^{t-1}, fresh uniform c_i per byte
    let mut coefficients = Zeroizing::new(vec![0u8; threshold as usize]);
    for &secret_byte in secret {
        coefficients[0] = secret_byte;
        OsRng.fill_bytes(&mut coefficients[1..]);

        for share in &mut shares {
            share.data.push(poly_eval(&coefficients, share.index));
        }
    }

    Ok(shares)
}

/// Reconstruct a secret from at least `threshold` shares.
///
/// Fewer than `threshold` shares is an error, never a guess: the
/// interpolation would otherwise return an unrelated value.
pub fn reconstruct_secret(
    shares: &[Share],
    threshold: u8,
) -> Result<Zeroizing<Vec<u8>>, ShamirError> {
    if threshold < 2 {
        return Err(ShamirError::InvalidThreshold);
    }
    if shares.len() < threshold as usize || shares.is_empty() {
        return Err(ShamirError::InsufficientShares {
            needed: threshold,
            got: shares.len(),
        });
    }

    let secret_len = shares[0].data.len();
    if secret_len == 0 || shares.iter().any(|s| s.data.len() != secret_len) {
        return Err(ShamirError::InvalidShare(
            "Shares have different lengths".into(),
        ));
    }
    if shares.iter().any(|s| s.index == 0) {
        return Err(ShamirError::InvalidShare("Share index 0".into()));
    }

    let mut indices: Vec<u8> = shares.iter().map(|s| s.index).collect();
    indices.sort_unstable();
    indices.dedup();
    if indices.len() != shares.len() {
        return Err(ShamirError::InvalidShare("Duplicate share indices".into()));
    }

    let mut secret = Zeroizing::new(Vec::with_capacity(secret_len));
    let mut points: Vec<(u8, u8)> = Vec::with_capacity(shares.len());
    for byte_idx in 0..secret_len {
        points.clear();
        points.extend(shares.iter().map(|s| (s.index, s.data[byte_idx])));
        secret.push(lagrange_interpolate(&points));
    }

    Ok(secret)
}

/// Split a symmetric key according to `scheme`.
pub fn split_key(key: &SymmetricKey, scheme: &ShareScheme) -> Result<Vec<Share>, ShamirError> {
    scheme.validate()?;
    split_secret(key.as_bytes(), scheme.threshold, scheme.total_shares)
}

/// Recover a symmetric key from at least `scheme.threshold` shares.
pub fn recover_key(shares: &[Share], scheme: &ShareScheme) -> Result<SymmetricKey, ShamirError> {
    scheme.validate()?;
    let bytes = reconstruct_secret(shares, scheme.threshold)?;
    Ok(SymmetricKey::from_slice(&bytes)?)
}

/// All `k`-element index subsets of `0..n`, in lexicographic order.
///
/// Subsets are produced one at a time, so callers that stop at the first
/// usable subset never pay for the rest.
pub fn threshold_subsets(n: usize, k: usize) -> ThresholdSubsets {
    ThresholdSubsets {
        n,
        indices: (0..k).collect(),
        started: false,
        done: k > n,
    }
}

/// Iterator returned by [`threshold_subsets`].
#[derive(Debug, Clone)]
pub struct ThresholdSubsets {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Iterator for ThresholdSubsets {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        // Rightmost position that can still move up
        let k = self.indices.len();
        let Some(pos) = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i) else {
            self.done = true;
            return None;
        };
        self.indices[pos] += 1;
        for i in pos + 1..k {
            self.indices[i] = self.indices[i - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

/// Check that every `threshold`-sized subset reconstructs the same secret.
///
/// Useful for detecting a corrupted share when more than `threshold` are
/// available.
pub fn verify_shares(shares: &[Share], threshold: u8) -> Result<bool, ShamirError> {
    if threshold < 2 {
        return Err(ShamirError::InvalidThreshold);
    }
    let mut expected: Option<Zeroizing<Vec<u8>>> = None;

    for subset in threshold_subsets(shares.len(), threshold as usize) {
        let picked: Vec<Share> = subset.iter().map(|&i| shares[i].clone()).collect();
        let secret = reconstruct_secret(&picked, threshold)?;
        match &expected {
            None => expected = Some(secret),
            Some(first) if *first != secret => return Ok(false),
            Some(_) => {}
        }
    }

    match expected {
        Some(_) => Ok(true),
        None => Err(ShamirError::InsufficientShares {
            needed: threshold,
            got: shares.len(),
        }),
    }
}
