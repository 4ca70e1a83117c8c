use crate::error::BackendError;
use crate::protocol::{DeviceId, RawEvent, Registration};

/// Creates device handles from registrations
pub trait Backend {
    /// Realize a device with every creation parameter at once
    fn create(
        &mut self,
        id: DeviceId,
        registration: &Registration,
    ) -> Result<Box<dyn DeviceHandle>, BackendError>;
}

/// An open virtual device.
///
/// Each handle is owned by exactly one [`Device`](super::Device), which calls [`close`] once.
///
/// [`close`]: DeviceHandle::close
pub trait DeviceHandle {
    /// Write the events in order, as one batch
    fn inject(&mut self, events: &[RawEvent]) -> Result<(), BackendError>;

    /// Advance the handle's clock after the caller has waited `millis`
    fn delay(&mut self, millis: u64) -> Result<(), BackendError>;

    /// Called between slices of a long delay, while the caller is still waiting
    fn idle(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Emit a barrier tagged with `token`
    fn sync(&mut self, token: &str) -> Result<(), BackendError>;

    /// Destroy the device and release its resources
    fn close(&mut self) -> Result<(), BackendError>;
}
