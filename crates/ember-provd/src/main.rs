//! Ember Provd - Main entry point
//!
//! Services the provisioning line protocol on stdin/stdout until `RESET`
//! restarts the process or a hardware fault halts it. All logging goes to
//! stderr so the protocol stream stays clean.

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::rngs::OsRng;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ember_hal::{BlobStore, DsHsm, FuseStore, KeySlot, MemBlobStore, MemFuse, SoftHsm};
use ember_session::{PostAction, Session};

use ember_provd::transport::{LineReader, Poll, ReadyGate};
use ember_provd::{splash, ProvdConfig};

/// How long one transport poll waits before checking readiness
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "ember-provd", version, about = "Device identity provisioning daemon")]
struct Args {
    /// Path to the config file (default: $EMBER_PROVD_CONFIG or the
    /// platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run with an in-memory blob store, ignoring the configured path
    #[arg(long)]
    dev: bool,
}

fn main() -> anyhow::Result<()> {
    // Protocol output owns stdout; logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember_provd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    info!("starting ember-provd v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var_os("EMBER_PROVD_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("/etc"))
                .join("ember")
                .join("provd.json")
        });

    let mut config = if config_path.exists() {
        ProvdConfig::load(&config_path)?
    } else {
        let config = ProvdConfig::default();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save(&config_path)?;
        info!("created default config at {:?}", config_path);
        config
    };
    if args.dev {
        config.dev_mode = true;
    }

    let fuse = MemFuse::new();
    let hsm = SoftHsm::new(fuse.clone());
    let slot = KeySlot::new(config.attest_key_slot)?;

    if config.dev_mode {
        info!("dev mode: in-memory blob store");
        let store = MemBlobStore::new();
        run(hsm, fuse, store, config, slot)
    } else {
        config.ensure_directories()?;
        let store = ember_hal::FileBlobStore::new(config.blob_store_path.clone())?;
        run(hsm, fuse, store, config, slot)
    }
}

fn run<H, F, B>(hsm: H, fuse: F, store: B, config: ProvdConfig, slot: KeySlot) -> anyhow::Result<()>
where
    H: DsHsm,
    F: FuseStore,
    B: BlobStore,
{
    match splash::check(&hsm, &fuse, &store, slot, config.key_bits) {
        Ok(status) => info!(?status, "startup check complete"),
        Err(e) => fatal_halt(&e.to_string()),
    }

    let mut session = Session::new(hsm, fuse, store, OsRng, config.key_bits, slot);
    let mut reader = LineReader::stdin();
    let mut ready = ReadyGate::new();

    info!(key_bits = config.key_bits, "servicing provisioning commands");

    loop {
        match reader.poll(POLL_TIMEOUT) {
            Poll::Idle => {
                if ready.due(Instant::now()) {
                    emit("<READY");
                }
            }
            Poll::Pending => ready.disarm(),
            Poll::Overflow => {
                ready.disarm();
                emit("! buffer exceeded length, purging");
                emit("<ERROR");
            }
            Poll::Eof => {
                info!("input closed, exiting");
                return Ok(());
            }
            Poll::Line(line) => {
                ready.disarm();
                match session.handle_line(&line) {
                    Ok(reply) => {
                        for out in reply.render() {
                            emit(&out);
                        }
                        match reply.action() {
                            PostAction::Restart => restart_process(),
                            PostAction::RearmReady => ready.rearm(),
                            PostAction::None => {}
                        }
                    }
                    Err(e) => fatal_halt(&e.to_string()),
                }
            }
        }
    }
}

fn emit(line: &str) {
    println!("{}", line);
    std::io::stdout().flush().ok();
}

/// Fatal hardware or derivation fault: report once, then halt.
///
/// One-time fuse state may be mid-burn; continuing or retrying risks
/// making it inconsistent, so the process parks until power-cycled.
fn fatal_halt(msg: &str) -> ! {
    error!(msg, "fatal fault, halting");
    emit(&format!("! [PANIC] {}", msg));
    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}

/// Restart the whole process, as `RESET` requires.
fn restart_process() -> ! {
    info!("restarting");
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        if let Ok(exe) = std::env::current_exe() {
            let err = std::process::Command::new(exe)
                .args(std::env::args_os().skip(1))
                .exec();
            error!("exec failed: {}", err);
        }
    }
    std::process::exit(0);
}

/// Helper module for dirs functionality
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    }
}
