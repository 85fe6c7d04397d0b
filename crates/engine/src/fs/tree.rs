//! Arena-backed virtual filesystem with path resolution.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. A
//! directory's children map is the only ownership edge; the parent link is a
//! plain index used for `..` and for printing paths. Every walk is an
//! explicit loop, so arbitrarily deep trees cannot exhaust the call stack.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::error::{FsError, ReadError};
use super::node::{FileType, FsNode, NodeId, NodeKind, NodeName};

/// Default ceiling for displayable file length, in lines.
pub const MAX_READ_LINES: usize = 1000;

/// Text returned when reading a file with no content.
pub const EMPTY_FILE_TEXT: &str = "(empty file)";

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Executable,
}

/// A directory entry as returned by [`FileSystem::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name as it was created.
    pub name: String,
    pub kind: EntryKind,
}

/// An in-memory directory tree for one device.
///
/// The topology is built once and then shared read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FileSystem {
    nodes: Vec<FsNode>,
    root: NodeId,
}

impl FileSystem {
    /// Create a filesystem containing only the root directory.
    pub fn new() -> Self {
        Self {
            nodes: vec![FsNode::root()],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look up a node by id.
    pub fn get(&self, id: NodeId) -> Option<&FsNode> {
        self.nodes.get(id.0)
    }

    /// Returns true if `id` names a directory.
    pub fn is_dir(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(FsNode::is_dir)
    }

    /// Create a directory under `parent`.
    pub fn add_directory(&mut self, parent: NodeId, name: &str) -> Result<NodeId, FsError> {
        self.insert(
            parent,
            name,
            NodeKind::Directory {
                children: HashMap::new(),
            },
        )
    }

    /// Create a file under `parent`.
    pub fn add_file(
        &mut self,
        parent: NodeId,
        name: &str,
        content: impl Into<String>,
        file_type: FileType,
    ) -> Result<NodeId, FsError> {
        self.insert(
            parent,
            name,
            NodeKind::File {
                content: content.into(),
                file_type,
            },
        )
    }

    /// Insert a fresh node. Only ever appends, so a node can never become its
    /// own ancestor or be shared between two parents.
    fn insert(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId, FsError> {
        let name = NodeName::new(name)?;
        let key = name.key();

        match self.get(parent).map(FsNode::kind) {
            None => return Err(FsError::NotFound(format!("node #{}", parent.0))),
            Some(NodeKind::File { .. }) => {
                return Err(FsError::NotADirectory(self.path_of(parent)));
            }
            Some(NodeKind::Directory { children }) if children.contains_key(&key) => {
                return Err(FsError::DuplicateName(name.to_string()));
            }
            Some(NodeKind::Directory { .. }) => {}
        }

        let id = NodeId(self.nodes.len());
        if let NodeKind::Directory { children } = &mut self.nodes[parent.0].kind {
            children.insert(key, id);
        }
        self.nodes.push(FsNode {
            name: Some(name),
            parent: Some(parent),
            kind,
        });
        Ok(id)
    }

    /// Resolve `path` starting at `from` (or at the root for absolute paths).
    ///
    /// Segments match case-insensitively. `.` and empty segments are skipped;
    /// `..` takes exactly one step to the parent and stays put at the root.
    /// Resolution stops at the first segment that cannot be followed.
    pub fn resolve(&self, path: &str, from: NodeId) -> Result<NodeId, FsError> {
        let mut cursor = if path.starts_with('/') { self.root } else { from };
        if self.get(cursor).is_none() {
            return Err(FsError::NotFound(path.to_string()));
        }

        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    cursor = self.nodes[cursor.0].parent.unwrap_or(cursor);
                }
                name => {
                    let children = match &self.nodes[cursor.0].kind {
                        NodeKind::Directory { children } => children,
                        NodeKind::File { .. } => {
                            return Err(FsError::NotADirectory(path.to_string()));
                        }
                    };
                    cursor = *children
                        .get(&name.to_lowercase())
                        .ok_or_else(|| FsError::NotFound(path.to_string()))?;
                }
            }
        }

        Ok(cursor)
    }

    /// Entries of a directory: directories first, then files, each group
    /// sorted case-insensitively.
    pub fn entries(&self, dir: NodeId) -> Result<Vec<DirEntry>, FsError> {
        let children = match self.get(dir).map(FsNode::kind) {
            Some(NodeKind::Directory { children }) => children,
            Some(NodeKind::File { .. }) => return Err(FsError::NotADirectory(self.path_of(dir))),
            None => return Err(FsError::NotFound(format!("node #{}", dir.0))),
        };

        let mut entries: Vec<DirEntry> = children
            .values()
            .map(|id| {
                let node = &self.nodes[id.0];
                let kind = match node.kind {
                    NodeKind::Directory { .. } => EntryKind::Directory,
                    NodeKind::File {
                        file_type: FileType::Executable,
                        ..
                    } => EntryKind::Executable,
                    NodeKind::File { .. } => EntryKind::File,
                };
                DirEntry {
                    name: node.name().to_string(),
                    kind,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            let a_is_dir = a.kind == EntryKind::Directory;
            let b_is_dir = b.kind == EntryKind::Directory;
            match (a_is_dir, b_is_dir) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => a
                    .name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.name.cmp(&b.name)),
            }
        });

        Ok(entries)
    }

    /// Child names of a directory in listing order.
    pub fn list(&self, dir: NodeId) -> Result<Vec<String>, FsError> {
        Ok(self
            .entries(dir)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Content of a text file, subject to the simulation's display policy.
    pub fn read(&self, id: NodeId, max_lines: usize) -> Result<&str, ReadError> {
        match self.get(id).map(FsNode::kind) {
            None | Some(NodeKind::Directory { .. }) => Err(ReadError::IsADirectory),
            Some(NodeKind::File {
                file_type: FileType::Executable,
                ..
            }) => Err(ReadError::Executable),
            Some(NodeKind::File { content, .. }) => {
                let lines = content.lines().count();
                if lines > max_lines {
                    return Err(ReadError::TooLarge {
                        lines,
                        limit: max_lines,
                    });
                }
                if content.is_empty() {
                    Ok(EMPTY_FILE_TEXT)
                } else {
                    Ok(content.as_str())
                }
            }
        }
    }

    /// Absolute path of a node.
    ///
    /// The walk is bounded by the arena size, so a corrupt parent chain ends
    /// the loop instead of spinning.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = id;

        for _ in 0..self.nodes.len() {
            let Some(node) = self.get(cursor) else { break };
            match node.parent {
                Some(parent) if parent != cursor => {
                    names.push(node.name());
                    cursor = parent;
                }
                _ => break,
            }
        }

        if names.is_empty() {
            return "/".to_string();
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Home directory for `username`: `/root` for root, `/home/<username>`
    /// for everyone else, falling back to the filesystem root when that
    /// directory does not exist.
    pub fn home_for(&self, username: &str) -> NodeId {
        if NodeName::new(username).is_err() {
            return self.root;
        }
        let home = if username == "root" {
            "/root".to_string()
        } else {
            format!("/home/{username}")
        };
        match self.resolve(&home, self.root) {
            Ok(id) if self.is_dir(id) => id,
            _ => self.root,
        }
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}
