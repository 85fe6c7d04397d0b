//! World file loading and validation.
//!
//! A world file is JSON describing the local machine, the remote devices and
//! a table of named filesystems. Everything is validated here, once; a world
//! that loads successfully can no longer produce configuration errors at
//! runtime.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::device::{Device, DeviceRecord, Interface};
use super::network::{shares_network, NetworkContext};
use super::World;
use crate::fs::{FileSystem, FileType, FsError, NodeId};

/// Errors detected while validating a world file.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The file is not valid JSON or does not match the schema.
    #[error("invalid world JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A node record breaks the file/directory shape rules.
    #[error("filesystem {filesystem:?} at {path}: {reason}")]
    InvalidNode {
        filesystem: String,
        path: String,
        reason: &'static str,
    },

    /// A node could not be inserted into its tree.
    #[error("filesystem {filesystem:?} at {path}: {source}")]
    Filesystem {
        filesystem: String,
        path: String,
        source: FsError,
    },

    /// A device points at a filesystem that is not defined.
    #[error("device {device:?} references unknown filesystem {filesystem:?}")]
    UnknownFilesystem { device: String, filesystem: String },

    /// Hostname is empty or contains whitespace or `@`.
    #[error("invalid hostname: {0:?}")]
    InvalidHostname(String),

    /// Two devices share a hostname (case-insensitive).
    #[error("duplicate hostname: {0}")]
    DuplicateHostname(String),

    /// The same filesystem name is defined twice.
    #[error("duplicate filesystem: {0}")]
    DuplicateFilesystem(String),

    /// Two devices share a primary address.
    #[error("duplicate address: {0}")]
    DuplicateAddress(String),

    /// An address does not parse.
    #[error("device {device:?} has invalid address {address:?}")]
    InvalidAddress { device: String, address: String },
}

/// JSON object entries in file order.
///
/// Unlike a map, repeated keys are all kept, so a name given twice reaches
/// validation instead of silently replacing the first definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entries<T>(pub Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Entries<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Serialize> Serialize for Entries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// A filesystem node as written in the world file.
///
/// `type` is `"file"`, `"executable"` or `"directory"`; when absent the node
/// is a directory. Files carry `content` and no `children`; directories carry
/// `children` and no `content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Entries<NodeRecord>>,
}

/// Top-level world file shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldRecord {
    /// The machine the player logs into at the console.
    pub local: DeviceRecord,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    pub filesystems: Entries<NodeRecord>,
}

/// Validated shape of one node record.
enum RecordShape<'a> {
    Directory(&'a Entries<NodeRecord>),
    File(&'a str, FileType),
}

fn invalid(filesystem: &str, path: &str, reason: &'static str) -> WorldError {
    WorldError::InvalidNode {
        filesystem: filesystem.to_string(),
        path: path.to_string(),
        reason,
    }
}

fn classify<'a>(
    filesystem: &str,
    path: &str,
    record: &'a NodeRecord,
) -> Result<RecordShape<'a>, WorldError> {
    let file_type = match record.node_type.as_deref() {
        None | Some("directory") => None,
        Some("file") => Some(FileType::Text),
        Some("executable") => Some(FileType::Executable),
        Some(_) => return Err(invalid(filesystem, path, "unknown node type")),
    };

    match file_type {
        None => {
            if record.content.is_some() {
                return Err(invalid(filesystem, path, "directory must not carry content"));
            }
            record
                .children
                .as_ref()
                .map(RecordShape::Directory)
                .ok_or_else(|| invalid(filesystem, path, "directory must carry children"))
        }
        Some(file_type) => {
            if record.children.is_some() {
                return Err(invalid(filesystem, path, "file must not carry children"));
            }
            record
                .content
                .as_deref()
                .map(|content| RecordShape::File(content, file_type))
                .ok_or_else(|| invalid(filesystem, path, "file must carry content"))
        }
    }
}

/// Build a filesystem from its record using an explicit work stack.
pub fn build_filesystem(name: &str, root: &NodeRecord) -> Result<FileSystem, WorldError> {
    let children = match classify(name, "/", root)? {
        RecordShape::Directory(children) => children,
        RecordShape::File(..) => return Err(invalid(name, "/", "root must be a directory")),
    };

    let mut fs = FileSystem::new();
    let mut pending: Vec<(NodeId, String, &Entries<NodeRecord>)> =
        vec![(fs.root(), String::new(), children)];

    while let Some((parent, parent_path, children)) = pending.pop() {
        for (child_name, record) in children.iter() {
            let path = format!("{parent_path}/{child_name}");
            let inserted = match classify(name, &path, record)? {
                RecordShape::Directory(grandchildren) => {
                    fs.add_directory(parent, child_name).map(|id| {
                        pending.push((id, path.clone(), grandchildren));
                    })
                }
                RecordShape::File(content, file_type) => fs
                    .add_file(parent, child_name, content, file_type)
                    .map(|_| ()),
            };
            inserted.map_err(|source| WorldError::Filesystem {
                filesystem: name.to_string(),
                path,
                source,
            })?;
        }
    }

    Ok(fs)
}

fn parse_addr(device: &str, address: &str) -> Result<IpAddr, WorldError> {
    address.parse().map_err(|_| WorldError::InvalidAddress {
        device: device.to_string(),
        address: address.to_string(),
    })
}

fn build_device(
    record: &DeviceRecord,
    filesystems: &HashMap<&str, Arc<FileSystem>>,
) -> Result<Device, WorldError> {
    let hostname = record.hostname.trim();
    if hostname.is_empty() || hostname.contains(char::is_whitespace) || hostname.contains('@') {
        return Err(WorldError::InvalidHostname(record.hostname.clone()));
    }

    let ip = parse_addr(hostname, &record.ip)?;
    let interfaces = record
        .interfaces
        .iter()
        .map(|iface| {
            Ok(Interface {
                name: iface.name.clone(),
                ip: parse_addr(hostname, &iface.ip)?,
                netmask: iface.netmask.clone(),
                network: iface.network.clone(),
            })
        })
        .collect::<Result<Vec<_>, WorldError>>()?;

    let filesystem = filesystems
        .get(record.filesystem.as_str())
        .cloned()
        .ok_or_else(|| WorldError::UnknownFilesystem {
            device: hostname.to_string(),
            filesystem: record.filesystem.clone(),
        })?;

    Ok(Device::new(
        hostname.to_string(),
        ip,
        record.credentials.clone(),
        record.ports.clone(),
        record.motd.clone(),
        interfaces,
        filesystem,
    ))
}

impl World {
    /// Validate a parsed world record.
    pub fn from_record(record: &WorldRecord) -> Result<Self, WorldError> {
        let mut filesystems = HashMap::new();
        for (name, root) in record.filesystems.iter() {
            let tree = Arc::new(build_filesystem(name, root)?);
            if filesystems.insert(name, tree).is_some() {
                return Err(WorldError::DuplicateFilesystem(name.to_string()));
            }
        }

        let mut hostnames = HashSet::new();
        let mut addresses = HashSet::new();
        let mut devices = Vec::with_capacity(record.devices.len() + 1);
        for device_record in std::iter::once(&record.local).chain(&record.devices) {
            let device = build_device(device_record, &filesystems)?;
            if !hostnames.insert(device.hostname().to_lowercase()) {
                return Err(WorldError::DuplicateHostname(device.hostname().to_string()));
            }
            if !addresses.insert(device.ip()) {
                return Err(WorldError::DuplicateAddress(device.ip().to_string()));
            }
            devices.push(Arc::new(device));
        }

        let mut networks = HashMap::new();
        for device in &devices {
            let neighbors = devices
                .iter()
                .filter(|other| !other.is_same(device) && shares_network(device, other))
                .cloned()
                .collect();
            networks.insert(
                device.hostname().to_lowercase(),
                Arc::new(NetworkContext::new(Arc::clone(device), neighbors)),
            );
        }

        let local = devices.remove(0);
        tracing::debug!(
            local = %local.hostname(),
            devices = devices.len(),
            filesystems = filesystems.len(),
            "World validated"
        );

        Ok(Self {
            local,
            devices,
            networks,
        })
    }

    /// Parse and validate a world from a JSON string.
    ///
    /// Nesting depth is unbounded; the parser grows its stack on demand.
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let record = WorldRecord::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
        deserializer.end()?;
        Self::from_record(&record)
    }

    /// Load a world file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read world file: {}", path.display()))?;

        let world = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse world file: {}", path.display()))?;

        tracing::info!(
            "Loaded world with {} remote devices from {:?}",
            world.devices.len(),
            path
        );
        Ok(world)
    }
}
