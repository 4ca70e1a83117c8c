use crate::clock::{Clock, SystemClock};
use crate::error::ReplayError;
use crate::parser::EventSource;
use crate::protocol::*;
use tracing::{debug, info, warn};

mod backend;
mod device;
mod registry;
mod trace;
mod uinput;

pub use backend::{Backend, DeviceHandle};
pub use device::{DELAY_SLICE, Device, DeviceState};
pub use registry::DeviceRegistry;
pub use trace::TraceBackend;
pub use uinput::UinputBackend;

/// Routes script events to the devices they address.
///
/// The manager owns every device it creates. Devices live until the end of [`Manager::run`],
/// which always closes them, in registration order, however the run ends.
pub struct Manager {
    /// Registry of live devices
    devices: DeviceRegistry,
    /// Creates a handle for each registration
    backend: Box<dyn Backend>,
    /// Paces delays
    clock: Box<dyn Clock>,
}

impl Manager {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self::with_clock(backend, Box::new(SystemClock))
    }

    pub fn with_clock(backend: Box<dyn Backend>, clock: Box<dyn Clock>) -> Self {
        Self {
            devices: DeviceRegistry::new(),
            backend,
            clock,
        }
    }

    /// Process every event of `source`, then close all devices
    pub fn run(&mut self, source: &mut dyn EventSource) -> Result<(), ReplayError> {
        let result = self.process_all(source);
        self.shutdown();
        result
    }

    fn process_all(&mut self, source: &mut dyn EventSource) -> Result<(), ReplayError> {
        let mut processed = 0usize;
        while let Some(event) = source.next_event()? {
            self.process(event)?;
            processed += 1;
        }
        debug!("Script exhausted after {} events", processed);
        Ok(())
    }

    /// Route one event, creating the device on its first registration
    pub fn process(&mut self, event: Event) -> Result<(), ReplayError> {
        let id = event.id;
        let Some(device) = self.devices.get_mut(id) else {
            if event.command() != Command::Register {
                warn!(
                    "Unknown device id {} for {}. Ignoring event.",
                    id,
                    event.command()
                );
                return Ok(());
            }
            return self.register(event);
        };

        match event.body {
            EventBody::Register(_) => {
                warn!("Device id={} is already registered. Ignoring event.", id);
                Ok(())
            }
            EventBody::Inject(events) => device.inject(&events),
            EventBody::Delay(millis) => device.delay(millis, self.clock.as_ref()),
            EventBody::Sync(token) => device.sync(&token),
        }
    }

    /// Create the device for a registration event
    pub fn register(&mut self, event: Event) -> Result<(), ReplayError> {
        let command = event.command();
        let EventBody::Register(registration) = event.body else {
            return Err(ReplayError::NotRegistration {
                id: event.id,
                command,
            });
        };
        let device = Device::open(event.id, registration, self.backend.as_mut())?;
        if let Err(device) = self.devices.insert(device) {
            // Dropping closes the duplicate handle.
            warn!("Device id={} is already registered. Ignoring event.", device.id);
        }
        Ok(())
    }

    /// Close every registered device, in registration order
    pub fn shutdown(&mut self) {
        if !self.devices.is_empty() {
            info!("Closing {} devices", self.devices.len());
        }
        self.devices.close_all();
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.ids().collect()
    }
}
