#![no_main]

use libfuzzer_sys::fuzz_target;
use ember_session::Command;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // Parsing must never panic, whatever the line contains
        let cmd = Command::parse(line);

        // A parse that found a known command must have consumed the
        // whole name; everything else falls through to Unknown.
        if let Command::Unknown(raw) = cmd {
            assert_eq!(raw, line);
        }
    }
});
