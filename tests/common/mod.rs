#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use uireplay::manager::Manager;
use uireplay::parser;
use uireplay::{
    Backend, BackendError, Clock, DeviceHandle, DeviceId, RawEvent, Registration, ReplayError,
};

/// One call received by a recording backend or its handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(DeviceId, Registration),
    Inject(DeviceId, Vec<RawEvent>),
    Delay(DeviceId, u64),
    Idle(DeviceId),
    Sync(DeviceId, String),
    Close(DeviceId),
}

/// Call log shared between a backend and every handle it creates
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| matches(c)).count()
    }

    fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fail {
    Never,
    Create,
    Inject,
}

pub struct RecordingBackend {
    log: CallLog,
    fail: Fail,
}

impl RecordingBackend {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail: Fail::Never,
        }
    }

    pub fn failing(log: CallLog, fail: Fail) -> Self {
        Self { log, fail }
    }
}

impl Backend for RecordingBackend {
    fn create(
        &mut self,
        id: DeviceId,
        registration: &Registration,
    ) -> Result<Box<dyn DeviceHandle>, BackendError> {
        if self.fail == Fail::Create {
            return Err(BackendError::Rejected("creation refused".into()));
        }
        self.log.push(Call::Create(id, registration.clone()));
        Ok(Box::new(RecordingHandle {
            id,
            log: self.log.clone(),
            fail: self.fail,
        }))
    }
}

struct RecordingHandle {
    id: DeviceId,
    log: CallLog,
    fail: Fail,
}

impl DeviceHandle for RecordingHandle {
    fn inject(&mut self, events: &[RawEvent]) -> Result<(), BackendError> {
        if self.fail == Fail::Inject {
            return Err(BackendError::Rejected("write refused".into()));
        }
        self.log.push(Call::Inject(self.id, events.to_vec()));
        Ok(())
    }

    fn delay(&mut self, millis: u64) -> Result<(), BackendError> {
        self.log.push(Call::Delay(self.id, millis));
        Ok(())
    }

    fn idle(&mut self) -> Result<(), BackendError> {
        self.log.push(Call::Idle(self.id));
        Ok(())
    }

    fn sync(&mut self, token: &str) -> Result<(), BackendError> {
        self.log.push(Call::Sync(self.id, token.to_string()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.log.push(Call::Close(self.id));
        Ok(())
    }
}

/// Clock that records requested sleeps instead of blocking
#[derive(Debug, Clone, Default)]
pub struct VirtualClock(Rc<RefCell<Vec<Duration>>>);

impl VirtualClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.0.borrow().clone()
    }
}

impl Clock for VirtualClock {
    fn sleep(&self, duration: Duration) {
        self.0.borrow_mut().push(duration);
    }
}

/// Result of replaying a script against a recording backend and virtual clock
pub struct Replay {
    pub result: Result<(), ReplayError>,
    pub log: CallLog,
    pub clock: VirtualClock,
}

pub fn replay_with(script: &str, fail: Fail) -> Replay {
    let log = CallLog::default();
    let clock = VirtualClock::default();
    let mut manager = Manager::with_clock(
        Box::new(RecordingBackend::failing(log.clone(), fail)),
        Box::new(clock.clone()),
    );
    let result = match parser::open(script.as_bytes()) {
        Ok((_, mut source)) => manager.run(source.as_mut()),
        Err(e) => Err(ReplayError::Parse(e.into())),
    };
    Replay { result, log, clock }
}

pub fn replay(script: &str) -> Replay {
    replay_with(script, Fail::Never)
}
