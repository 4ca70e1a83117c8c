use crate::clock::Clock;
use crate::error::{BackendError, ReplayError};
use crate::manager::backend::{Backend, DeviceHandle};
use crate::protocol::*;
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Longest uninterrupted sleep during a delay. uinput clients wait at most 30 s for a force
/// feedback upload to be acknowledged.
pub const DELAY_SLICE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Open,
    Closed,
}

/// A registered virtual device and the handle it owns
pub struct Device {
    pub id: DeviceId,
    pub registration: Registration,
    handle: Box<dyn DeviceHandle>,
    state: DeviceState,
    /// Total delay processed so far, in milliseconds
    clock_offset_ms: u64,
}

impl Device {
    /// Create the device from its registration in a single backend call
    pub fn open(
        id: DeviceId,
        registration: Registration,
        backend: &mut dyn Backend,
    ) -> Result<Self, ReplayError> {
        debug!(
            "Creating device {} with config: name={}, vendor_id=0x{:04x}, product_id=0x{:04x}",
            id, registration.name, registration.vendor_id, registration.product_id
        );
        let handle = backend
            .create(id, &registration)
            .map_err(|source| ReplayError::DeviceCreation { id, source })?;
        info!("Created device {} ({})", id, registration.name);

        Ok(Self {
            id,
            registration,
            handle,
            state: DeviceState::Open,
            clock_offset_ms: 0,
        })
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn clock_offset_ms(&self) -> u64 {
        self.clock_offset_ms
    }

    fn ensure_open(&self, command: Command) -> Result<(), ReplayError> {
        match self.state {
            DeviceState::Open => Ok(()),
            DeviceState::Closed => Err(ReplayError::DeviceClosed {
                id: self.id,
                command,
            }),
        }
    }

    fn failed(&self, command: Command, source: BackendError) -> ReplayError {
        ReplayError::Injection {
            id: self.id,
            command,
            source,
        }
    }

    pub fn inject(&mut self, events: &[RawEvent]) -> Result<(), ReplayError> {
        self.ensure_open(Command::Inject)?;
        trace!("Device {}: injecting {} events", self.id, events.len());
        self.handle
            .inject(events)
            .map_err(|e| self.failed(Command::Inject, e))
    }

    /// Block for `millis` on `clock`, then advance the handle's clock.
    ///
    /// Long delays are slept in [`DELAY_SLICE`] steps with [`DeviceHandle::idle`] in between,
    /// so the handle can answer requests that time out before the delay ends.
    pub fn delay(&mut self, millis: u64, clock: &dyn Clock) -> Result<(), ReplayError> {
        self.ensure_open(Command::Delay)?;
        trace!("Device {}: delaying {} ms", self.id, millis);
        let mut remaining = Duration::from_millis(millis);
        while remaining > DELAY_SLICE {
            clock.sleep(DELAY_SLICE);
            remaining -= DELAY_SLICE;
            self.handle
                .idle()
                .map_err(|e| self.failed(Command::Delay, e))?;
        }
        clock.sleep(remaining);
        self.clock_offset_ms = self.clock_offset_ms.saturating_add(millis);
        self.handle
            .delay(millis)
            .map_err(|e| self.failed(Command::Delay, e))
    }

    pub fn sync(&mut self, token: &str) -> Result<(), ReplayError> {
        self.ensure_open(Command::Sync)?;
        trace!("Device {}: sync {}", self.id, token);
        self.handle
            .sync(token)
            .map_err(|e| self.failed(Command::Sync, e))
    }

    /// Release the handle. Only the first call reaches the backend.
    pub fn close(&mut self) {
        if self.state == DeviceState::Closed {
            return;
        }
        self.state = DeviceState::Closed;
        match self.handle.close() {
            Ok(()) => info!("Device {} closed", self.id),
            Err(e) => error!("Failed to close device {}: {}", self.id, e),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}
