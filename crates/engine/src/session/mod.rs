//! Logged-in session state and the SSH hop chain.

pub mod hops;
pub mod state;

pub use hops::{redact, HopError, HopStack, SshHopFrame, MAX_HOPS};
pub use state::{Identity, SessionState};
