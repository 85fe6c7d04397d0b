//! Saved sessions of an SSH hop chain.

use std::sync::Arc;

use protocol::HopView;
use thiserror::Error;

use crate::fs::{FileSystem, NodeId};
use crate::world::NetworkContext;

use super::state::Identity;

/// Maximum number of saved hops.
pub const MAX_HOPS: usize = 10;

/// Errors from hop stack operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HopError {
    /// A push would exceed the limit. The stack has been cleared.
    #[error("hop limit of {limit} exceeded, hop chain reset")]
    Overflow { limit: usize },
}

/// Everything needed to put a session back the way it was.
#[derive(Debug, Clone)]
pub struct SshHopFrame {
    pub identity: Identity,
    pub cwd: NodeId,
    pub current_path: String,
    pub filesystem: Arc<FileSystem>,
    pub network: Arc<NetworkContext>,
}

/// Bounded LIFO of saved sessions.
#[derive(Debug, Clone)]
pub struct HopStack {
    frames: Vec<SshHopFrame>,
    limit: usize,
}

impl HopStack {
    /// Create an empty stack holding at most `limit` frames.
    pub fn new(limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            limit,
        }
    }

    /// Save a frame.
    ///
    /// A push onto a full stack clears every saved frame and fails. Refusing
    /// only the new frame would leave a chain the player can no longer extend.
    pub fn push(&mut self, frame: SshHopFrame) -> Result<(), HopError> {
        if self.frames.len() >= self.limit {
            let dropped = self.frames.len();
            self.frames.clear();
            tracing::warn!(limit = self.limit, dropped, "Hop stack overflow, stack cleared");
            return Err(HopError::Overflow { limit: self.limit });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Remove the most recent frame. `None` means the session is already
    /// on the local machine.
    pub fn pop(&mut self) -> Option<SshHopFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns true if some saved frame is `username` on `hostname`.
    pub fn contains(&self, hostname: &str, username: &str) -> bool {
        self.frames.iter().any(|frame| {
            frame.identity.hostname.eq_ignore_ascii_case(hostname)
                && frame.identity.username == username
        })
    }

    /// Saved frames, oldest first.
    pub fn frames(&self) -> &[SshHopFrame] {
        &self.frames
    }

    /// Redacted views of the saved frames, oldest first.
    pub fn views(&self) -> Vec<HopView> {
        self.frames
            .iter()
            .map(|frame| HopView {
                username: redact(&frame.identity.username),
                hostname: frame.identity.hostname.clone(),
            })
            .collect()
    }
}

impl Default for HopStack {
    fn default() -> Self {
        Self::new(MAX_HOPS)
    }
}

/// Keep the first character, mask the rest.
pub fn redact(username: &str) -> String {
    let mut chars = username.chars();
    match chars.next() {
        Some(first) => std::iter::once(first)
            .chain(chars.map(|_| '*'))
            .collect(),
        None => String::new(),
    }
}
