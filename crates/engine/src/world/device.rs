//! Simulated devices.
//!
//! A [`DeviceRecord`] is the JSON shape found in world files; a [`Device`] is
//! the validated runtime form holding a shared handle to its filesystem.

use std::net::IpAddr;
use std::sync::Arc;

use protocol::{DeviceInfo, InterfaceInfo};
use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

/// Port a device must expose to accept SSH hops.
pub const SSH_PORT: u16 = 22;

/// Default netmask when a record omits one.
fn default_netmask() -> String {
    "255.255.255.0".to_string()
}

/// A username/password pair accepted by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub username: String,
    pub password: String,
}

/// A network interface as written in the world file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Interface name, e.g. `eth0`.
    pub name: String,
    /// Address on this interface.
    pub ip: String,
    #[serde(default = "default_netmask")]
    pub netmask: String,
    /// Logical network segment; devices sharing a segment can reach each other.
    pub network: String,
}

/// A device as written in the world file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub hostname: String,
    /// Primary address.
    pub ip: String,
    #[serde(default)]
    pub credentials: Vec<CredentialRecord>,
    /// Name of an entry in the world's `filesystems` table.
    pub filesystem: String,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub motd: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
}

/// Validated network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub ip: IpAddr,
    pub netmask: String,
    pub network: String,
}

/// Result of checking a credential pair against a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted,
    UnknownUser,
    WrongPassword,
}

/// A simulated host.
#[derive(Debug)]
pub struct Device {
    hostname: String,
    ip: IpAddr,
    credentials: Vec<CredentialRecord>,
    ports: Vec<u16>,
    motd: Option<String>,
    interfaces: Vec<Interface>,
    filesystem: Arc<FileSystem>,
}

impl Device {
    /// Assemble a device from already validated parts.
    pub fn new(
        hostname: String,
        ip: IpAddr,
        credentials: Vec<CredentialRecord>,
        ports: Vec<u16>,
        motd: Option<String>,
        interfaces: Vec<Interface>,
        filesystem: Arc<FileSystem>,
    ) -> Self {
        Self {
            hostname,
            ip,
            credentials,
            ports,
            motd,
            interfaces,
            filesystem,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn motd(&self) -> Option<&str> {
        self.motd.as_deref()
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Shared handle to this device's filesystem.
    pub fn filesystem(&self) -> &Arc<FileSystem> {
        &self.filesystem
    }

    /// Returns true if `target` names this device by hostname (any case),
    /// primary address, or interface address.
    pub fn matches(&self, target: &str) -> bool {
        if self.hostname.eq_ignore_ascii_case(target) {
            return true;
        }
        match target.parse::<IpAddr>() {
            Ok(addr) => addr == self.ip || self.interfaces.iter().any(|iface| iface.ip == addr),
            Err(_) => false,
        }
    }

    /// Returns true if both handles describe the same host.
    pub fn is_same(&self, other: &Device) -> bool {
        self.hostname.eq_ignore_ascii_case(&other.hostname)
    }

    pub fn is_port_open(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }

    pub fn accepts_ssh(&self) -> bool {
        self.is_port_open(SSH_PORT)
    }

    /// Network segments this device is attached to.
    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(|iface| iface.network.as_str())
    }

    /// Check a credential pair. Usernames and passwords are case-sensitive.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        match self.credentials.iter().find(|c| c.username == username) {
            None => AuthOutcome::UnknownUser,
            Some(cred) if cred.password == password => AuthOutcome::Accepted,
            Some(_) => AuthOutcome::WrongPassword,
        }
    }

    /// Presentation view of this device.
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            hostname: self.hostname.clone(),
            ip: self.ip.to_string(),
            interfaces: self
                .interfaces
                .iter()
                .map(|iface| InterfaceInfo {
                    name: iface.name.clone(),
                    ip: iface.ip.to_string(),
                    netmask: iface.netmask.clone(),
                })
                .collect(),
            open_ports: self.ports.clone(),
        }
    }
}
