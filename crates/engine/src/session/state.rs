//! The logged-in session.

use std::fmt;
use std::sync::Arc;

use crate::fs::{FileSystem, FsError, NodeId};
use crate::world::{Device, NetworkContext};

use super::hops::{HopStack, SshHopFrame};

/// Who the session is logged in as, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub hostname: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            hostname: hostname.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.username == "root"
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.hostname)
    }
}

/// State of a logged-in shell on one device.
///
/// Values are never edited in place. Changing directory, hopping in and
/// hopping out all build a new `SessionState`, so `current_path` always
/// describes `cwd` and the filesystem and network handles always belong to
/// the same device.
#[derive(Debug, Clone)]
pub struct SessionState {
    identity: Identity,
    cwd: NodeId,
    current_path: String,
    filesystem: Arc<FileSystem>,
    network: Arc<NetworkContext>,
    hops: HopStack,
}

impl SessionState {
    /// Log `username` into the device described by `network`, starting in
    /// the user's home directory (or the root when there is none).
    pub fn login(username: &str, network: Arc<NetworkContext>, hops: HopStack) -> Self {
        let device = Arc::clone(network.origin());
        let filesystem = Arc::clone(device.filesystem());
        let cwd = filesystem.home_for(username);
        Self {
            identity: Identity::new(username, device.hostname()),
            current_path: filesystem.path_of(cwd),
            cwd,
            filesystem,
            network,
            hops,
        }
    }

    /// Rebuild a session from a saved hop frame.
    pub fn restore(frame: SshHopFrame, hops: HopStack) -> Self {
        Self {
            identity: frame.identity,
            cwd: frame.cwd,
            current_path: frame.current_path,
            filesystem: frame.filesystem,
            network: frame.network,
            hops,
        }
    }

    /// Save everything except the hop stack into a frame.
    pub fn to_frame(&self) -> SshHopFrame {
        SshHopFrame {
            identity: self.identity.clone(),
            cwd: self.cwd,
            current_path: self.current_path.clone(),
            filesystem: Arc::clone(&self.filesystem),
            network: Arc::clone(&self.network),
        }
    }

    /// Resolve `path` from the working directory.
    pub fn resolve(&self, path: &str) -> Result<NodeId, FsError> {
        self.filesystem.resolve(path, self.cwd)
    }

    /// A copy of this session standing in `dir`.
    pub fn with_cwd(&self, dir: NodeId) -> Result<Self, FsError> {
        if !self.filesystem.is_dir(dir) {
            return Err(FsError::NotADirectory(self.filesystem.path_of(dir)));
        }
        Ok(Self {
            cwd: dir,
            current_path: self.filesystem.path_of(dir),
            ..self.clone()
        })
    }

    /// Split off the hop stack, leaving an empty one behind.
    pub fn take_hops(&mut self) -> HopStack {
        let limit = self.hops.limit();
        std::mem::replace(&mut self.hops, HopStack::new(limit))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }

    pub fn hostname(&self) -> &str {
        &self.identity.hostname
    }

    pub fn cwd(&self) -> NodeId {
        self.cwd
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn filesystem(&self) -> &Arc<FileSystem> {
        &self.filesystem
    }

    pub fn network(&self) -> &Arc<NetworkContext> {
        &self.network
    }

    /// The device the session is on.
    pub fn device(&self) -> &Arc<Device> {
        self.network.origin()
    }

    pub fn hops(&self) -> &HopStack {
        &self.hops
    }

    /// Shell prompt, `#` for root and `$` for everyone else.
    pub fn prompt(&self) -> String {
        let sigil = if self.identity.is_root() { '#' } else { '$' };
        format!("{}:{}{} ", self.identity, self.current_path, sigil)
    }

    /// Names in the working directory.
    pub fn listing(&self) -> Vec<String> {
        self.filesystem.list(self.cwd).unwrap_or_default()
    }
}
