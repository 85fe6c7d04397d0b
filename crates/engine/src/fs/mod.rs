//! Virtual filesystem for simulated devices.
//!
//! This module provides the per-device directory tree:
//! - Arena storage with validated, case-insensitive names
//! - Path resolution with `.`/`..` handling that can never escape the root
//! - Directory listing and policy-limited file reads
//!
//! # Safety against hostile trees
//!
//! Names are validated at insertion, insertion can only append fresh nodes,
//! and every traversal is an explicit loop. Deep or malformed paths therefore
//! produce ordinary errors rather than stack exhaustion or cycles.

pub mod error;
pub mod node;
pub mod tree;

pub use error::{FsError, ReadError};
pub use node::{FileType, FsNode, NodeId, NodeKind, NodeName};
pub use tree::{DirEntry, EntryKind, FileSystem, EMPTY_FILE_TEXT, MAX_READ_LINES};
