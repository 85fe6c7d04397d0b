//! Filesystem node types.

use std::collections::HashMap;
use std::fmt;

use super::error::FsError;

/// Index of a node inside its [`FileSystem`](super::FileSystem) arena.
///
/// Ids are only meaningful for the filesystem that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// A validated entry name.
///
/// Names are checked once, when they are created, so lookups never have to
/// deal with separators or relative components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeName(String);

impl NodeName {
    /// Validate and wrap a name.
    pub fn new(name: impl Into<String>) -> Result<Self, FsError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(FsError::InvalidName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive lookup key.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content classification of a file node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// Readable text.
    #[default]
    Text,
    /// A program; listing shows it, reading refuses it.
    Executable,
}

/// Directory or file payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Children keyed by lowercased name.
    Directory { children: HashMap<String, NodeId> },
    File { content: String, file_type: FileType },
}

/// A single node in the arena.
#[derive(Debug, Clone)]
pub struct FsNode {
    /// `None` only for the root.
    pub(crate) name: Option<NodeName>,
    /// Non-owning back-reference, `None` only for the root.
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl FsNode {
    pub(crate) fn root() -> Self {
        Self {
            name: None,
            parent: None,
            kind: NodeKind::Directory {
                children: HashMap::new(),
            },
        }
    }

    /// Display name; the root is shown as `/`.
    pub fn name(&self) -> &str {
        self.name.as_ref().map_or("/", NodeName::as_str)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_executable(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::File {
                file_type: FileType::Executable,
                ..
            }
        )
    }
}
