#![no_main]

use libfuzzer_sys::fuzz_target;
use ember_hal::{KeySlot, MemBlobStore, MemFuse, SoftHsm};
use ember_session::Session;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let fuse = MemFuse::new();
    let mut session = Session::new(
        SoftHsm::new(fuse.clone()),
        fuse,
        MemBlobStore::new(),
        ChaCha20Rng::seed_from_u64(0),
        512,
        KeySlot::new(2).unwrap(),
    );

    for line in input.lines().take(16) {
        // The soft collaborators never fail fatally, so every line must
        // come back as a reply with exactly one terminal status.
        let reply = session.handle_line(line).unwrap();
        let rendered = reply.render();
        let terminal = rendered.last().unwrap();
        assert!(terminal == "<OK" || terminal == "<ERROR");
    }
});
