//! Reachability between devices.

use std::sync::Arc;

use super::device::Device;

/// What the active session can see on the network.
///
/// Built once per device when the world is loaded and shared by every
/// session standing on that device.
#[derive(Debug)]
pub struct NetworkContext {
    origin: Arc<Device>,
    neighbors: Vec<Arc<Device>>,
}

impl NetworkContext {
    pub fn new(origin: Arc<Device>, neighbors: Vec<Arc<Device>>) -> Self {
        Self { origin, neighbors }
    }

    /// Device this context belongs to.
    pub fn origin(&self) -> &Arc<Device> {
        &self.origin
    }

    /// Devices sharing at least one network segment with the origin.
    pub fn neighbors(&self) -> &[Arc<Device>] {
        &self.neighbors
    }

    /// Find a reachable device by hostname or address.
    pub fn find_neighbor(&self, target: &str) -> Option<&Arc<Device>> {
        self.neighbors.iter().find(|device| device.matches(target))
    }

    /// Returns true if `device` can be reached from the origin.
    pub fn can_reach(&self, device: &Device) -> bool {
        self.neighbors.iter().any(|neighbor| neighbor.is_same(device))
    }
}

/// Returns true if the two devices share a network segment.
pub fn shares_network(a: &Device, b: &Device) -> bool {
    a.networks().any(|net| b.networks().any(|other| other == net))
}
