#![no_main]

use libfuzzer_sys::fuzz_target;
use ember_core::parse::{decode_hex_exact, parse_decimal};

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = std::str::from_utf8(data) {
        // Bounded decimal: at most 7 digits, so the result always fits
        if let Ok(n) = parse_decimal(value) {
            assert!(n < 10_000_000);
        }

        // Exact-length hex: success implies exactly the requested width
        for len in [8, 32, 64] {
            if let Ok(bytes) = decode_hex_exact(value, len) {
                assert_eq!(bytes.len(), len);
            }
        }
    }
});
