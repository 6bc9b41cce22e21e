#![no_main]

use heirloom_core::SealedEnvelope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Wrapped share records arrive as hex strings from the audit log.
    // Parsing must never panic, whatever the ledger hands back.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = SealedEnvelope::from_hex(s);
    }

    if let Ok(envelope) = SealedEnvelope::from_bytes(data) {
        let bytes = envelope.to_bytes();
        assert_eq!(SealedEnvelope::from_bytes(&bytes).ok(), Some(envelope));
    }
});
