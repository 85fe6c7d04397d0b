//! # HopShell Protocol Library
//!
//! This crate defines the contract between the HopShell session engine and
//! whatever presents it to a player (console, GUI, web front-end).
//!
//! ## Overview
//!
//! The engine is driven one line at a time. Every call returns a
//! [`RenderSnapshot`] describing everything needed to draw the terminal:
//!
//! - **Phase**: booting, logging in (with the active prompt), or shell
//! - **Output**: ordered lines, each tagged with a [`Severity`]
//! - **Context**: prompt, working directory, directory listing, device info
//! - **Hops**: depth and a redacted view of the SSH hop chain
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{OutputLine, Phase, RenderSnapshot};
//!
//! let mut snapshot = RenderSnapshot::new(Phase::Shell);
//! snapshot.extend_output(vec![OutputLine::error("cat: notes: No such file or directory")]);
//! assert!(snapshot.is_error);
//!
//! let bytes = snapshot.to_msgpack().unwrap();
//! let decoded = RenderSnapshot::from_msgpack(&bytes).unwrap();
//! assert_eq!(snapshot, decoded);
//! ```
//!
//! ## Modules
//!
//! - [`snapshot`]: Render snapshot and output line definitions
//! - [`error`]: Error types

pub mod error;
pub mod snapshot;

pub use error::{ProtocolError, Result};
pub use snapshot::{
    DeviceInfo, HopView, InterfaceInfo, LoginPrompt, OutputLine, Phase, RenderSnapshot, Severity,
    SNAPSHOT_VERSION,
};
