//! uireplay - Replay input device scripts through uinput
//!
//! A script is either a stream of JSON commands or an evemu recording. Each command addresses
//! a device id; the first `REGISTER` for an id creates the virtual device, and later commands
//! inject events into it, wait, or emit sync barriers. Every device is destroyed when the
//! script ends, whether it ran to completion or not.

pub mod clock;
pub mod codes;
pub mod error;
pub mod manager;
pub mod parser;
pub mod protocol;
pub mod uinput;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use error::{BackendError, Dialect, Location, ParseError, ReplayError};
pub use manager::{Backend, DeviceHandle, Manager, TraceBackend, UinputBackend};
pub use parser::EventSource;
pub use protocol::{
    AbsInfo, BusType, Command, ConfigEntry, ConfigKind, DeviceId, EV_ABS, EV_FF, EV_KEY, EV_REL,
    EV_SYN, Event, EventBody, RawEvent, Registration, SYN_REPORT,
};
