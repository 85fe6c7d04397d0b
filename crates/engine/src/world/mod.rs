//! Simulated devices and the network that connects them.
//!
//! A [`World`] is loaded once from JSON and then only read. Every device
//! holds an `Arc` to its filesystem and every device has a precomputed
//! [`NetworkContext`] listing the hosts it can reach.

use std::collections::HashMap;
use std::sync::Arc;

pub mod device;
pub mod loader;
pub mod network;

pub use device::{
    AuthOutcome, CredentialRecord, Device, DeviceRecord, Interface, InterfaceRecord, SSH_PORT,
};
pub use loader::{build_filesystem, Entries, NodeRecord, WorldError, WorldRecord};
pub use network::{shares_network, NetworkContext};

/// World shipped with the binary, used when no world file is configured.
const BUILTIN_WORLD: &str = include_str!("../../worlds/default.json");

/// The validated set of devices a session can visit.
#[derive(Debug)]
pub struct World {
    local: Arc<Device>,
    devices: Vec<Arc<Device>>,
    /// Keyed by lowercased hostname.
    networks: HashMap<String, Arc<NetworkContext>>,
}

impl World {
    /// Parse the built-in world.
    pub fn builtin() -> Result<Self, WorldError> {
        Self::from_json(BUILTIN_WORLD)
    }

    /// The machine the player logs into at the console.
    pub fn local(&self) -> &Arc<Device> {
        &self.local
    }

    /// Remote devices, in file order.
    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    /// Find any device in the world by hostname or address.
    pub fn find_device(&self, target: &str) -> Option<&Arc<Device>> {
        std::iter::once(&self.local)
            .chain(&self.devices)
            .find(|device| device.matches(target))
    }

    /// Reachability context for a device of this world.
    pub fn network_for(&self, device: &Device) -> Option<Arc<NetworkContext>> {
        self.networks
            .get(&device.hostname().to_lowercase())
            .cloned()
    }
}
