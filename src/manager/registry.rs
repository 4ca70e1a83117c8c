use super::device::Device;
use crate::protocol::DeviceId;
use std::collections::HashMap;

/// Arena of registered devices, iterated in registration order
#[derive(Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    index: HashMap<DeviceId, usize>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.index.contains_key(&id)
    }

    /// Add a device; returns it back if the id is already taken
    pub fn insert(&mut self, device: Device) -> Result<(), Device> {
        if self.contains(device.id) {
            return Err(device);
        }
        self.index.insert(device.id, self.devices.len());
        self.devices.push(device);
        Ok(())
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.index.get(&id).map(|&slot| &self.devices[slot])
    }

    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.index.get(&id).map(|&slot| &mut self.devices[slot])
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.devices.iter().map(|d| d.id)
    }

    /// Close every device in registration order
    pub fn close_all(&mut self) {
        for device in &mut self.devices {
            device.close();
        }
    }
}
