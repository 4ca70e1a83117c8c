use super::EventSource;
use crate::error::{Dialect, Location, ParseError};
use crate::protocol::*;
use std::collections::{BTreeMap, VecDeque};
use std::io::BufRead;
use tracing::{debug, trace, warn};

/// Recordings describe a single device, registered under this id
pub const EVEMU_DEVICE_ID: DeviceId = 1;

/// Smallest timestamp gap, in milliseconds, replayed as an explicit delay
pub const DELAY_THRESHOLD_MS: u64 = 1;

// Recordings do not store the effect slot count, but uinput refuses EV_FF devices without one.
const DEFAULT_FF_EFFECTS_MAX: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Events,
    Done,
}

struct Field<'a> {
    text: &'a str,
    column: usize,
}

/// Split `line` on whitespace, keeping the 1-based column of every field
fn fields(line: &str, offset: usize) -> Vec<Field<'_>> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push(Field {
                    text: &line[s..i],
                    column: offset + s + 1,
                });
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(Field {
            text: &line[s..],
            column: offset + s + 1,
        });
    }
    out
}

/// Codes whose bits are set in a little-endian byte mask
fn mask_codes(mask: &[u8]) -> Vec<u16> {
    let mut codes = Vec::new();
    for (index, byte) in mask.iter().enumerate() {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                codes.push((index * 8 + bit) as u16);
            }
        }
    }
    codes
}

#[derive(Debug, Default)]
struct Header {
    version: Option<String>,
    name: Option<String>,
    ids: Option<[u16; 4]>,
    props: Vec<u8>,
    bits: BTreeMap<u16, Vec<u8>>,
    abs_info: BTreeMap<u16, AbsInfo>,
}
impl Header {
    fn registration(self) -> Registration {
        let [bus, vendor_id, product_id, version_id] = self.ids.unwrap_or_default();
        let mut configuration = Vec::new();
        let mut ff_effects_max = 0;

        for (&event_type, mask) in &self.bits {
            let codes = mask_codes(mask);
            if codes.is_empty() {
                continue;
            }
            match ConfigKind::for_event_type(event_type) {
                Some(kind) => {
                    if kind == ConfigKind::FfBit {
                        ff_effects_max = DEFAULT_FF_EFFECTS_MAX;
                    }
                    configuration.push(ConfigEntry { kind, codes });
                }
                None => debug!("No uinput setter for event type {:#04x}, skipping", event_type),
            }
        }
        let props = mask_codes(&self.props);
        if !props.is_empty() {
            configuration.push(ConfigEntry {
                kind: ConfigKind::PropBit,
                codes: props,
            });
        }

        Registration {
            name: self.name.unwrap_or_default(),
            vendor_id,
            product_id,
            version_id,
            bus: BusType::from_raw(bus),
            configuration,
            ff_effects_max,
            abs_info: self.abs_info,
            port: None,
        }
    }
}

struct EventLine {
    timestamp_us: u64,
    event: RawEvent,
}

/// Parser for evemu recordings (`evemu-record` output).
///
/// The header becomes one registration for [`EVEMU_DEVICE_ID`]. Event lines are grouped into
/// one injection per `SYN_REPORT` frame, and the timestamp gap between frames is replayed as a
/// delay once it reaches [`DELAY_THRESHOLD_MS`]. Sub-millisecond remainders carry over to the
/// next gap.
pub struct EvemuParser<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
    state: State,
    lookahead: Option<EventLine>,
    pending: VecDeque<Event>,
    clock_us: Option<u64>,
}

impl<R: BufRead> EvemuParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
            state: State::Header,
            lookahead: None,
            pending: VecDeque::new(),
            clock_us: None,
        }
    }

    fn error(&mut self, column: usize, reason: impl Into<String>) -> ParseError {
        self.state = State::Done;
        self.pending.clear();
        ParseError::malformed(
            Dialect::Evemu,
            Location::Line {
                line: self.line_no,
                column,
            },
            reason,
        )
    }

    /// Read the next non-blank line into `self.buf`; false at end of input
    fn read_line(&mut self) -> Result<bool, ParseError> {
        loop {
            self.buf.clear();
            let read = match self.reader.read_line(&mut self.buf) {
                Ok(read) => read,
                Err(e) => {
                    self.state = State::Done;
                    self.pending.clear();
                    return Err(ParseError::Io(e));
                }
            };
            if read == 0 {
                return Ok(false);
            }
            self.line_no += 1;
            let trimmed = self.buf.trim_end_matches(['\n', '\r']).len();
            self.buf.truncate(trimmed);
            if !self.buf.trim().is_empty() {
                return Ok(true);
            }
        }
    }

    fn hex<T: TryFrom<u64>>(&mut self, field: &Field<'_>, what: &str) -> Result<T, ParseError> {
        u64::from_str_radix(field.text, 16)
            .ok()
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| {
                let reason = format!("invalid {} `{}`, expected hex", what, field.text);
                self.error(field.column, reason)
            })
    }

    fn dec<T: std::str::FromStr>(&mut self, field: &Field<'_>, what: &str) -> Result<T, ParseError> {
        field.text.parse::<T>().map_err(|_| {
            let reason = format!("invalid {} `{}`", what, field.text);
            self.error(field.column, reason)
        })
    }

    fn timestamp(&mut self, field: &Field<'_>) -> Result<u64, ParseError> {
        let parsed = field.text.split_once('.').and_then(|(sec, usec)| {
            if usec.is_empty() || usec.len() > 6 || !usec.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let sec: u64 = sec.parse().ok()?;
            let usec: u64 = format!("{:0<6}", usec).parse().ok()?;
            sec.checked_mul(1_000_000)?.checked_add(usec)
        });
        parsed.ok_or_else(|| {
            let reason = format!("invalid timestamp `{}`, expected <sec>.<usec>", field.text);
            self.error(field.column, reason)
        })
    }

    /// Parse an `E:` line held in `self.buf`
    fn event_line(&mut self) -> Result<EventLine, ParseError> {
        let line = std::mem::take(&mut self.buf);
        let body = line[2..].split('#').next().unwrap_or("");
        let fields = fields(body, 2);
        if fields.len() != 4 {
            let reason = format!("expected `E: <time> <type> <code> <value>`, got {:?}", line);
            return Err(self.error(1, reason));
        }
        let timestamp_us = self.timestamp(&fields[0])?;
        let event_type = self.hex(&fields[1], "event type")?;
        let code = self.hex(&fields[2], "event code")?;
        let value = self.dec(&fields[3], "event value")?;
        Ok(EventLine {
            timestamp_us,
            event: RawEvent::new(event_type, code, value),
        })
    }

    /// Consume header lines up to the first event line and build the registration
    fn read_header(&mut self) -> Result<Registration, ParseError> {
        let mut header = Header::default();
        while self.read_line()? {
            if let Some(comment) = self.buf.strip_prefix('#') {
                if let Some(version) = comment.trim().strip_prefix("EVEMU") {
                    header.version = Some(version.trim().to_string());
                }
                continue;
            }
            let tag = match self.buf.split_once(':') {
                Some((tag, _)) if tag.len() == 1 => tag.chars().next().unwrap_or_default(),
                _ => {
                    let reason = format!("unrecognized line {:?}", self.buf);
                    return Err(self.error(1, reason));
                }
            };
            if tag == 'E' {
                self.lookahead = Some(self.event_line()?);
                break;
            }

            let line = std::mem::take(&mut self.buf);
            let body = if tag == 'N' {
                &line[2..]
            } else {
                line[2..].split('#').next().unwrap_or("")
            };
            let fields = fields(body, 2);
            match tag {
                'N' => {
                    let name = body.trim();
                    if name.is_empty() {
                        return Err(self.error(3, "empty device name"));
                    }
                    header.name = Some(name.to_string());
                }
                'I' => {
                    if fields.len() != 4 {
                        let reason = "expected `I: <bus> <vendor> <product> <version>`";
                        return Err(self.error(1, reason));
                    }
                    let mut ids = [0u16; 4];
                    for (id, field) in ids.iter_mut().zip(&fields) {
                        *id = self.hex(field, "id")?;
                    }
                    header.ids = Some(ids);
                }
                'P' => {
                    for field in &fields {
                        let byte = self.hex(field, "property byte")?;
                        header.props.push(byte);
                    }
                }
                'B' => {
                    let Some((event_type, bytes)) = fields.split_first() else {
                        return Err(self.error(1, "expected `B: <type> <mask bytes>`"));
                    };
                    let event_type: u16 = self.hex(event_type, "event type")?;
                    let mut mask = Vec::with_capacity(bytes.len());
                    for field in bytes {
                        mask.push(self.hex::<u8>(field, "mask byte")?);
                    }
                    header.bits.entry(event_type).or_default().extend(mask);
                }
                'A' => {
                    if fields.len() != 5 && fields.len() != 6 {
                        let reason = "expected `A: <code> <min> <max> <fuzz> <flat> [<resolution>]`";
                        return Err(self.error(1, reason));
                    }
                    let code: u16 = self.hex(&fields[0], "axis code")?;
                    let mut values = [0i32; 5];
                    for (value, field) in values.iter_mut().zip(&fields[1..]) {
                        *value = self.dec(field, "axis value")?;
                    }
                    let [minimum, maximum, fuzz, flat, resolution] = values;
                    header.abs_info.insert(
                        code,
                        AbsInfo {
                            value: 0,
                            minimum,
                            maximum,
                            fuzz,
                            flat,
                            resolution,
                        },
                    );
                }
                'L' | 'S' => trace!("Ignoring state line {:?}", line),
                other => {
                    let reason = format!("unexpected `{}:` line in header", other);
                    return Err(self.error(1, reason));
                }
            }
        }

        let at_end = self.lookahead.is_none();
        let fail = |parser: &mut Self, reason: &str| {
            if at_end {
                parser.state = State::Done;
                ParseError::malformed(Dialect::Evemu, Location::EndOfInput, reason)
            } else {
                parser.error(1, reason)
            }
        };
        if header.name.is_none() {
            return Err(fail(self, "missing `N:` device name line"));
        }
        if header.ids.is_none() {
            return Err(fail(self, "missing `I:` device id line"));
        }
        if let Some(version) = &header.version {
            debug!("Reading evemu recording, format version {}", version);
        }
        Ok(header.registration())
    }

    /// Next event line after the header, skipping comments
    fn next_event_line(&mut self) -> Result<Option<EventLine>, ParseError> {
        if let Some(line) = self.lookahead.take() {
            return Ok(Some(line));
        }
        while self.read_line()? {
            if self.buf.starts_with('#') {
                continue;
            }
            if self.buf.starts_with("E:") {
                return self.event_line().map(Some);
            }
            let reason = format!("expected an `E:` event line, got {:?}", self.buf);
            return Err(self.error(1, reason));
        }
        Ok(None)
    }

    /// Collect events up to and including the next `SYN_REPORT`
    fn read_frame(&mut self) -> Result<Option<(u64, Vec<RawEvent>)>, ParseError> {
        let mut timestamp_us = None;
        let mut events = Vec::new();
        while let Some(line) = self.next_event_line()? {
            timestamp_us.get_or_insert(line.timestamp_us);
            events.push(line.event);
            if line.event.is_sync_report() {
                break;
            }
        }
        Ok(timestamp_us.map(|ts| (ts, events)))
    }

    fn schedule(&mut self, timestamp_us: u64, events: Vec<RawEvent>) {
        match self.clock_us {
            None => self.clock_us = Some(timestamp_us),
            Some(clock) if timestamp_us < clock => {
                warn!(
                    "Timestamp went backwards at line {} ({} < {} us), restarting replay clock",
                    self.line_no, timestamp_us, clock
                );
                self.clock_us = Some(timestamp_us);
            }
            Some(clock) => {
                let delay_ms = (timestamp_us - clock) / 1000;
                if delay_ms >= DELAY_THRESHOLD_MS {
                    self.pending
                        .push_back(Event::new(EVEMU_DEVICE_ID, EventBody::Delay(delay_ms)));
                    self.clock_us = Some(clock + delay_ms * 1000);
                }
            }
        }
        self.pending
            .push_back(Event::new(EVEMU_DEVICE_ID, EventBody::Inject(events)));
    }
}

impl<R: BufRead> EventSource for EvemuParser<R> {
    fn next_event(&mut self) -> Result<Option<Event>, ParseError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            match self.state {
                State::Header => {
                    let registration = self.read_header()?;
                    self.state = State::Events;
                    return Ok(Some(Event::new(
                        EVEMU_DEVICE_ID,
                        EventBody::Register(registration),
                    )));
                }
                State::Events => match self.read_frame()? {
                    Some((timestamp_us, events)) => self.schedule(timestamp_us, events),
                    None => self.state = State::Done,
                },
                State::Done => return Ok(None),
            }
        }
    }
}
