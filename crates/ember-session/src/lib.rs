//! Ember Session - The provisioning command interpreter
//!
//! One [`Session`] exists per process execution. It owns all staged
//! identity material for a device being provisioned and interprets the
//! line protocol: parse a command, check its readiness guards, run it to
//! completion against the hardware collaborators, emit exactly one
//! terminal `<OK` or `<ERROR`.

pub mod attest;
pub mod command;
pub mod error;
pub mod reply;
pub mod session;

pub use command::Command;
pub use error::{Result, SessionError};
pub use reply::{PostAction, Reply, Status};
pub use session::Session;
