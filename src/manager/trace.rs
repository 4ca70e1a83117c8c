use crate::error::BackendError;
use crate::manager::backend::{Backend, DeviceHandle};
use crate::protocol::*;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

type SharedWriter = Rc<RefCell<Box<dyn Write>>>;

/// Backend that describes every device call as a JSON line instead of touching the kernel.
///
/// Used for dry runs, so a script can be checked on machines without `/dev/uinput`.
pub struct TraceBackend {
    out: SharedWriter,
}

impl TraceBackend {
    pub fn new(out: impl Write + 'static) -> Self {
        Self {
            out: Rc::new(RefCell::new(Box::new(out))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

fn emit(out: &SharedWriter, line: Value) -> Result<(), BackendError> {
    let mut out = out.borrow_mut();
    serde_json::to_writer(&mut *out, &line).map_err(|e| BackendError::os("trace", e.into()))?;
    out.write_all(b"\n")
        .and_then(|_| out.flush())
        .map_err(|e| BackendError::os("trace", e))
}

impl Backend for TraceBackend {
    fn create(
        &mut self,
        id: DeviceId,
        registration: &Registration,
    ) -> Result<Box<dyn DeviceHandle>, BackendError> {
        emit(
            &self.out,
            json!({ "call": "create", "id": id, "registration": registration }),
        )?;
        Ok(Box::new(TraceHandle {
            id,
            out: Rc::clone(&self.out),
        }))
    }
}

struct TraceHandle {
    id: DeviceId,
    out: SharedWriter,
}

impl DeviceHandle for TraceHandle {
    fn inject(&mut self, events: &[RawEvent]) -> Result<(), BackendError> {
        emit(
            &self.out,
            json!({ "call": "inject", "id": self.id, "events": events }),
        )
    }

    fn delay(&mut self, millis: u64) -> Result<(), BackendError> {
        emit(
            &self.out,
            json!({ "call": "delay", "id": self.id, "millis": millis }),
        )
    }

    fn sync(&mut self, token: &str) -> Result<(), BackendError> {
        emit(
            &self.out,
            json!({ "call": "sync", "id": self.id, "syncToken": token }),
        )
    }

    fn close(&mut self) -> Result<(), BackendError> {
        emit(&self.out, json!({ "call": "close", "id": self.id }))
    }
}
