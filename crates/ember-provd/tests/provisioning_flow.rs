//! End-to-end provisioning flow over the line transport

use std::sync::mpsc::channel;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use ember_hal::{KeySlot, MemBlobStore, MemFuse, SoftHsm};
use ember_provd::transport::{LineReader, Poll};
use ember_provd::splash::{self, SplashStatus};
use ember_session::{PostAction, Session, Status};

const KEY_BITS: usize = 512;

#[test]
fn test_scripted_provisioning_transcript() {
    let script = format!(
        "SET-MODEL=7\n\
         SET-MODEL=abc\n\
         GEN-KEY\n\
         SET-MODEL=1001\n\
         SET-SERIAL=42\n\
         BURN\n\
         SET-ATTEST={}\n\
         ATTEST=0000000000000000\n\
         WRITE\n\
         DUMP\n\
         VERSION\n\
         RESET\n",
        "00".repeat(64)
    );

    let (tx, rx) = channel();
    tx.send(script.into_bytes()).unwrap();
    drop(tx);
    let mut reader = LineReader::new(rx);

    let fuse = MemFuse::new();
    let store = MemBlobStore::new();
    let slot = KeySlot::new(2).unwrap();
    let mut session = Session::new(
        SoftHsm::new(fuse.clone()),
        fuse.clone(),
        store.clone(),
        ChaCha20Rng::seed_from_u64(1),
        KEY_BITS,
        slot,
    );

    let mut statuses = Vec::new();
    let mut restart_requested = false;
    loop {
        match reader.poll(Duration::from_millis(5)) {
            Poll::Line(line) => {
                let reply = session.handle_line(&line).unwrap();
                statuses.push(reply.status());
                if reply.action() == PostAction::Restart {
                    restart_requested = true;
                }
            }
            Poll::Eof => break,
            Poll::Pending | Poll::Idle => {}
            Poll::Overflow => panic!("unexpected overflow"),
        }
    }

    // Only the malformed SET-MODEL is rejected
    let expected: Vec<Status> = (0..12)
        .map(|i| if i == 1 { Status::Error } else { Status::Ok })
        .collect();
    assert_eq!(statuses, expected);
    assert!(restart_requested);

    // The next process start sees a provisioned, self-consistent device
    let hsm = SoftHsm::new(fuse.clone());
    let status = splash::check(&hsm, &fuse, &store, slot, KEY_BITS).unwrap();
    assert_eq!(status, SplashStatus::Verified);
}
