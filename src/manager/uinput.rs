use crate::error::BackendError;
use crate::manager::backend::{Backend, DeviceHandle};
use crate::protocol::*;
use crate::uinput::*;
use serde_json::json;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::mem::size_of;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

pub const DEFAULT_UINPUT_PATH: &str = "/dev/uinput";

// Effect ids below this are playback requests; FF_GAIN and FF_AUTOCENTER sit above it.
const FF_GAIN: u16 = 0x60;

/// Creates kernel devices through the uinput node
pub struct UinputBackend {
    path: PathBuf,
}

impl UinputBackend {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_UINPUT_PATH)
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for UinputBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check(ret: libc::c_int, op: &'static str) -> Result<(), BackendError> {
    if ret < 0 {
        Err(BackendError::last_os(op))
    } else {
        Ok(())
    }
}

fn setter(kind: ConfigKind) -> (u64, &'static str) {
    match kind {
        ConfigKind::EvBit => (UI_SET_EVBIT, "UI_SET_EVBIT"),
        ConfigKind::KeyBit => (UI_SET_KEYBIT, "UI_SET_KEYBIT"),
        ConfigKind::RelBit => (UI_SET_RELBIT, "UI_SET_RELBIT"),
        ConfigKind::AbsBit => (UI_SET_ABSBIT, "UI_SET_ABSBIT"),
        ConfigKind::MscBit => (UI_SET_MSCBIT, "UI_SET_MSCBIT"),
        ConfigKind::LedBit => (UI_SET_LEDBIT, "UI_SET_LEDBIT"),
        ConfigKind::SndBit => (UI_SET_SNDBIT, "UI_SET_SNDBIT"),
        ConfigKind::FfBit => (UI_SET_FFBIT, "UI_SET_FFBIT"),
        ConfigKind::SwBit => (UI_SET_SWBIT, "UI_SET_SWBIT"),
        ConfigKind::PropBit => (UI_SET_PROPBIT, "UI_SET_PROPBIT"),
    }
}

fn configure(fd: RawFd, registration: &Registration) -> Result<(), BackendError> {
    for entry in &registration.configuration {
        let (request, op) = setter(entry.kind);
        for &code in &entry.codes {
            trace!("{} {}", op, code);
            check(
                unsafe { libc::ioctl(fd, request as _, code as libc::c_int) },
                op,
            )?;
        }
    }

    for (&code, info) in &registration.abs_info {
        let setup = uinput_abs_setup {
            code,
            absinfo: input_absinfo {
                value: info.value,
                minimum: info.minimum,
                maximum: info.maximum,
                fuzz: info.fuzz,
                flat: info.flat,
                resolution: info.resolution,
            },
        };
        check(
            unsafe { libc::ioctl(fd, UI_ABS_SETUP as _, &setup as *const uinput_abs_setup) },
            "UI_ABS_SETUP",
        )?;
    }

    if let Some(port) = &registration.port {
        let phys = CString::new(port.as_str())
            .map_err(|_| BackendError::Rejected(format!("port {:?} contains a NUL byte", port)))?;
        check(
            unsafe { libc::ioctl(fd, UI_SET_PHYS as _, phys.as_ptr()) },
            "UI_SET_PHYS",
        )?;
    }

    let setup = uinput_setup::new(
        input_id {
            bustype: registration.bus.to_raw(),
            vendor: registration.vendor_id,
            product: registration.product_id,
            version: registration.version_id,
        },
        &registration.name,
        registration.ff_effects_max,
    );
    check(
        unsafe { libc::ioctl(fd, UI_DEV_SETUP as _, &setup as *const uinput_setup) },
        "UI_DEV_SETUP",
    )?;
    check(unsafe { libc::ioctl(fd, UI_DEV_CREATE as _) }, "UI_DEV_CREATE")
}

impl Backend for UinputBackend {
    fn create(
        &mut self,
        id: DeviceId,
        registration: &Registration,
    ) -> Result<Box<dyn DeviceHandle>, BackendError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| BackendError::os("open uinput", e))?;

        // On failure the file is dropped before UI_DEV_CREATE succeeded, which releases the node.
        configure(file.as_raw_fd(), registration)?;
        info!(
            "uinput device {} created as \"{}\" ({:04x}:{:04x})",
            id, registration.name, registration.vendor_id, registration.product_id
        );

        Ok(Box::new(UinputHandle {
            id,
            file: Some(file),
            force_feedback: registration.ff_effects_max > 0,
            elapsed_ms: 0,
        }))
    }
}

/// Write one JSON report line to stdout
fn report(value: &serde_json::Value) -> Result<(), BackendError> {
    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, value).map_err(|e| BackendError::os("report", e.into()))?;
    out.write_all(b"\n")
        .and_then(|_| out.flush())
        .map_err(|e| BackendError::os("report", e))
}

struct UinputHandle {
    id: DeviceId,
    /// `None` once the device is destroyed
    file: Option<File>,
    force_feedback: bool,
    elapsed_ms: u64,
}

impl UinputHandle {
    fn file(&self) -> Result<&File, BackendError> {
        self.file
            .as_ref()
            .ok_or_else(|| BackendError::Rejected(format!("device {} is destroyed", self.id)))
    }

    /// Answer every pending force feedback request without blocking
    fn service_feedback(&mut self) -> Result<(), BackendError> {
        if !self.force_feedback {
            return Ok(());
        }
        let mut file = self.file()?;
        let fd = file.as_raw_fd();
        let mut buf = [0u8; size_of::<input_event>()];
        loop {
            match file.read(&mut buf) {
                Ok(n) if n == buf.len() => {}
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(BackendError::os("read uinput", e)),
            }
            let event = unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const input_event) };
            match (event.type_, event.code) {
                (EV_UINPUT, UI_FF_UPLOAD) => {
                    let mut upload: uinput_ff_upload = unsafe { std::mem::zeroed() };
                    upload.request_id = event.value as u32;
                    check(
                        unsafe {
                            libc::ioctl(fd, UI_BEGIN_FF_UPLOAD as _, &mut upload as *mut _)
                        },
                        "UI_BEGIN_FF_UPLOAD",
                    )?;
                    upload.retval = 0;
                    check(
                        unsafe { libc::ioctl(fd, UI_END_FF_UPLOAD as _, &upload as *const _) },
                        "UI_END_FF_UPLOAD",
                    )?;
                    debug!(
                        "Device {}: acknowledged upload of effect {}",
                        self.id, upload.effect.id
                    );
                }
                (EV_UINPUT, UI_FF_ERASE) => {
                    let mut erase: uinput_ff_erase = unsafe { std::mem::zeroed() };
                    erase.request_id = event.value as u32;
                    check(
                        unsafe { libc::ioctl(fd, UI_BEGIN_FF_ERASE as _, &mut erase as *mut _) },
                        "UI_BEGIN_FF_ERASE",
                    )?;
                    erase.retval = 0;
                    check(
                        unsafe { libc::ioctl(fd, UI_END_FF_ERASE as _, &erase as *const _) },
                        "UI_END_FF_ERASE",
                    )?;
                    debug!(
                        "Device {}: acknowledged erase of effect {}",
                        self.id, erase.effect_id
                    );
                }
                (EV_FF, code) if code < FF_GAIN => {
                    report(&json!({
                        "reason": "vibrating",
                        "id": self.id,
                        "effect": code,
                        "status": event.value != 0,
                    }))?;
                }
                (event_type, code) => {
                    trace!(
                        "Device {}: ignoring feedback event type={} code={}",
                        self.id, event_type, code
                    );
                }
            }
        }
    }
}

impl DeviceHandle for UinputHandle {
    fn inject(&mut self, events: &[RawEvent]) -> Result<(), BackendError> {
        let batch: Vec<input_event> = events
            .iter()
            .map(|e| input_event::new(e.event_type, e.code, e.value))
            .collect();
        let bytes = unsafe {
            std::slice::from_raw_parts(
                batch.as_ptr() as *const u8,
                batch.len() * size_of::<input_event>(),
            )
        };
        let mut file = self.file()?;
        file.write_all(bytes)
            .map_err(|e| BackendError::os("write uinput", e))?;
        self.service_feedback()
    }

    fn delay(&mut self, millis: u64) -> Result<(), BackendError> {
        self.elapsed_ms = self.elapsed_ms.saturating_add(millis);
        trace!("Device {}: clock at {} ms", self.id, self.elapsed_ms);
        self.service_feedback()
    }

    fn idle(&mut self) -> Result<(), BackendError> {
        self.service_feedback()
    }

    fn sync(&mut self, token: &str) -> Result<(), BackendError> {
        self.service_feedback()?;
        report(&json!({
            "reason": "sync",
            "id": self.id,
            "syncToken": token,
        }))
    }

    fn close(&mut self) -> Result<(), BackendError> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let ret = unsafe { libc::ioctl(file.as_raw_fd(), UI_DEV_DESTROY as _) };
        if ret < 0 {
            let err = BackendError::last_os("UI_DEV_DESTROY");
            warn!("Device {}: {}", self.id, err);
            return Err(err);
        }
        debug!("Device {}: destroyed", self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_node_fails_creation() {
        let mut backend = UinputBackend::with_path("/nonexistent/uinput");
        let err = backend
            .create(1, &Registration::new("pad", 0x045e, 0x028e))
            .err()
            .expect("creation should fail");
        assert!(matches!(err, BackendError::Os { op: "open uinput", .. }));
    }

    #[test]
    fn every_config_kind_has_a_setter() {
        let kinds = [
            ConfigKind::EvBit,
            ConfigKind::KeyBit,
            ConfigKind::RelBit,
            ConfigKind::AbsBit,
            ConfigKind::MscBit,
            ConfigKind::LedBit,
            ConfigKind::SndBit,
            ConfigKind::FfBit,
            ConfigKind::SwBit,
            ConfigKind::PropBit,
        ];
        let mut requests: Vec<u64> = kinds.iter().map(|&k| setter(k).0).collect();
        requests.sort_unstable();
        requests.dedup();
        assert_eq!(requests.len(), kinds.len());
    }

    #[test]
    fn default_backend_targets_dev_uinput() {
        assert_eq!(UinputBackend::default().path(), Path::new("/dev/uinput"));
    }
}
