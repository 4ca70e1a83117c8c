use crate::protocol::{Command, DeviceId};
use std::fmt;
use std::io;
use thiserror::Error;

/// Script dialect a parse error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Json,
    Evemu,
}
impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Json => f.write_str("JSON"),
            Dialect::Evemu => f.write_str("evemu"),
        }
    }
}

/// Where in the script a parse error was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Line { line: usize, column: usize },
    /// Index of a JSON command and the byte offset it ended at
    Entry { index: usize, offset: usize },
    EndOfInput,
}
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line { line, column } => write!(f, "line {}, column {}", line, column),
            Location::Entry { index, offset } => {
                write!(f, "command #{} (ending at byte {})", index, offset)
            }
            Location::EndOfInput => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{dialect} parse error at {location}: {reason}")]
    Malformed {
        dialect: Dialect,
        location: Location,
        reason: String,
    },
    #[error("error reading script: {0}")]
    Io(#[from] io::Error),
}
impl ParseError {
    pub fn malformed(dialect: Dialect, location: Location, reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            dialect,
            location,
            reason: reason.into(),
        }
    }
}

/// Failure reported by a device backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Rejected(String),
}
impl BackendError {
    pub fn os(op: &'static str, source: io::Error) -> Self {
        BackendError::Os { op, source }
    }

    /// Capture `errno` after a failed libc call
    pub fn last_os(op: &'static str) -> Self {
        BackendError::Os {
            op,
            source: io::Error::last_os_error(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to create device {id}: {source}")]
    DeviceCreation {
        id: DeviceId,
        #[source]
        source: BackendError,
    },
    #[error("failed to {command} on device {id}: {source}")]
    Injection {
        id: DeviceId,
        command: Command,
        #[source]
        source: BackendError,
    },
    #[error("tried to send command \"{command}\" to an unregistered device {id}")]
    NotRegistration { id: DeviceId, command: Command },
    #[error("device {id} is closed, cannot process {command}")]
    DeviceClosed { id: DeviceId, command: Command },
}
