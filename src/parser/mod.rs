//! Script front end.
//!
//! A script is either a stream of JSON commands or an evemu recording. [`sniff`] decides which
//! by looking at the first byte after any leading line breaks, and [`open`] binds the matching
//! parser for the rest of the run.

use crate::error::{Dialect, ParseError};
use crate::protocol::Event;
use std::io::{self, BufRead};
use tracing::debug;

mod evemu;
mod json;
mod sniff;

pub use evemu::{DELAY_THRESHOLD_MS, EVEMU_DEVICE_ID, EvemuParser};
pub use json::JsonParser;
pub use sniff::sniff;

/// Lazy producer of script events
pub trait EventSource {
    /// Parse and return the next event, or `None` once the script is exhausted
    fn next_event(&mut self) -> Result<Option<Event>, ParseError>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<Event>, ParseError> {
        (**self).next_event()
    }
}

/// Sniff the script dialect and build the parser for it
pub fn open<'a, R: BufRead + 'a>(reader: R) -> io::Result<(Dialect, Box<dyn EventSource + 'a>)> {
    let (dialect, reader) = sniff(reader)?;
    debug!("Detected {} script", dialect);
    let source: Box<dyn EventSource + 'a> = match dialect {
        Dialect::Json => Box::new(JsonParser::new(reader)),
        Dialect::Evemu => Box::new(EvemuParser::new(reader)),
    };
    Ok((dialect, source))
}

/// Drain a source into a vector, stopping at the first error
pub fn collect_events(source: &mut dyn EventSource) -> Result<Vec<Event>, ParseError> {
    let mut events = Vec::new();
    while let Some(event) = source.next_event()? {
        events.push(event);
    }
    Ok(events)
}
