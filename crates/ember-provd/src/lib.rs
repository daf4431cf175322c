//! Ember Provd - Host plumbing for the provisioning session
//!
//! The binary wires a [`ember_session::Session`] to stdin/stdout: a
//! bounded line transport with idle readiness announcements, JSON
//! configuration, the startup splash self-test, and the fatal-halt and
//! restart process behavior.

pub mod config;
pub mod error;
pub mod splash;
pub mod transport;

pub use config::ProvdConfig;
pub use error::{ProvdError, Result};
pub use transport::{LineReader, Poll, ReadyGate, READY_INTERVAL};
