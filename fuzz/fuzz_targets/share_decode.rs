#![no_main]

use heirloom_shamir::{reconstruct_secret, Share};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The public share is fetched from untrusted blob storage.
    if let Ok(share) = Share::from_bytes(data) {
        assert_ne!(share.index, 0);
        assert_eq!(&share.to_bytes()[..], data);
    }

    // Reconstruction over arbitrary equal-length shares must fail cleanly or
    // return a secret of the shared length.
    let shares: Vec<Share> = data
        .chunks(5)
        .filter_map(|chunk| Share::from_bytes(chunk).ok())
        .collect();
    if let Ok(secret) = reconstruct_secret(&shares, 3) {
        assert_eq!(secret.len(), shares[0].data.len());
    }
});
