#![no_main]

use heirloom_core::{decrypt_payload, SymmetricKey};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // A payload blob that was not produced under this key must never decrypt.
    let key = SymmetricKey::from_bytes([7u8; 32]);
    assert!(decrypt_payload(data, &key).is_err());
});
