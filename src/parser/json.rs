use super::EventSource;
use crate::codes;
use crate::error::{Dialect, Location, ParseError};
use crate::protocol::*;
use serde::Deserialize;
use serde_json::de::IoRead;
use serde_json::error::Category;
use serde_json::{StreamDeserializer, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::io::Read;
use tracing::trace;

/// A number written as a JSON integer, or as a string holding a decimal literal, a `0x` hex
/// literal or a symbolic constant name
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Text(String),
}
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(value) => write!(f, "{}", value),
            Scalar::Text(text) => write!(f, "`{}`", text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    id: Option<Scalar>,
    command: Option<String>,
    name: Option<String>,
    #[serde(alias = "vendorId")]
    vid: Option<Scalar>,
    #[serde(alias = "productId")]
    pid: Option<Scalar>,
    #[serde(alias = "versionId")]
    version: Option<Scalar>,
    bus: Option<Scalar>,
    configuration: Option<Vec<RawConfigEntry>>,
    #[serde(alias = "ffEffectsMax")]
    ff_effects_max: Option<Scalar>,
    #[serde(alias = "absInfo")]
    abs_info: Option<Vec<RawAbsEntry>>,
    port: Option<String>,
    events: Option<Vec<Scalar>>,
    duration: Option<Scalar>,
    #[serde(rename = "syncToken", alias = "sync_token", alias = "token")]
    sync_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfigEntry {
    #[serde(rename = "type")]
    kind: Option<Scalar>,
    #[serde(default)]
    data: Vec<Scalar>,
}

#[derive(Debug, Deserialize)]
struct RawAbsEntry {
    code: Option<Scalar>,
    info: Option<RawAbsInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAbsInfo {
    value: Option<Scalar>,
    minimum: Option<Scalar>,
    maximum: Option<Scalar>,
    fuzz: Option<Scalar>,
    flat: Option<Scalar>,
    resolution: Option<Scalar>,
}

/// Alternative spellings accepted for a required field
fn aliases(field: &str) -> &'static [&'static str] {
    match field {
        "vid" => &["vendorId"],
        "pid" => &["productId"],
        "syncToken" => &["sync_token", "token"],
        _ => &[],
    }
}

fn missing(field: &str) -> String {
    let mut message = format!("missing required field `{}`", field);
    let aliases = aliases(field);
    if !aliases.is_empty() {
        let spelled: Vec<String> = aliases.iter().map(|a| format!("`{}`", a)).collect();
        message.push_str(&format!(" ({})", spelled.join(", ")));
    }
    message
}

fn resolve(scalar: &Scalar, field: &str) -> Result<i64, String> {
    let text = match scalar {
        Scalar::Int(value) => return Ok(*value),
        Scalar::Text(text) => text.trim(),
    };

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let parsed = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse::<i64>().ok()
    } else {
        None
    };

    match parsed {
        Some(value) if negative => Ok(-value),
        Some(value) => Ok(value),
        None => codes::lookup(text)
            .map(i64::from)
            .ok_or_else(|| format!("unknown name `{}` in field `{}`", text, field)),
    }
}

fn int<T: TryFrom<i64>>(scalar: &Scalar, field: &str) -> Result<T, String> {
    let value = resolve(scalar, field)?;
    T::try_from(value).map_err(|_| format!("value {} for field `{}` is out of range", value, field))
}

fn required<T: TryFrom<i64>>(scalar: &Option<Scalar>, field: &str) -> Result<T, String> {
    match scalar {
        Some(scalar) => int(scalar, field),
        None => Err(missing(field)),
    }
}

fn optional<T: TryFrom<i64> + Default>(scalar: &Option<Scalar>, field: &str) -> Result<T, String> {
    match scalar {
        Some(scalar) => int(scalar, field),
        None => Ok(T::default()),
    }
}

fn bus(scalar: &Option<Scalar>) -> Result<BusType, String> {
    match scalar {
        None => Ok(BusType::default()),
        Some(Scalar::Text(name)) => match name.trim().to_ascii_lowercase().as_str() {
            "usb" => Ok(BusType::Usb),
            "bluetooth" => Ok(BusType::Bluetooth),
            "virtual" => Ok(BusType::Virtual),
            _ => int(&Scalar::Text(name.clone()), "bus").map(BusType::from_raw),
        },
        Some(scalar) => int(scalar, "bus").map(BusType::from_raw),
    }
}

fn configuration(entries: &[RawConfigEntry]) -> Result<Vec<ConfigEntry>, String> {
    entries
        .iter()
        .map(|entry| {
            let raw_kind = entry
                .kind
                .as_ref()
                .ok_or_else(|| missing("configuration.type"))?;
            let code = resolve(raw_kind, "configuration.type")?;
            let kind = ConfigKind::from_control_code(code)
                .ok_or_else(|| format!("unknown configuration type {}", raw_kind))?;
            let codes = entry
                .data
                .iter()
                .map(|code| int::<u16>(code, "configuration.data"))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ConfigEntry { kind, codes })
        })
        .collect()
}

fn abs_info(entries: &[RawAbsEntry]) -> Result<BTreeMap<u16, AbsInfo>, String> {
    let mut axes = BTreeMap::new();
    for entry in entries {
        let code: u16 = required(&entry.code, "abs_info.code")?;
        let info = entry.info.as_ref().ok_or_else(|| missing("abs_info.info"))?;
        axes.insert(
            code,
            AbsInfo {
                value: optional(&info.value, "abs_info.info.value")?,
                minimum: optional(&info.minimum, "abs_info.info.minimum")?,
                maximum: optional(&info.maximum, "abs_info.info.maximum")?,
                fuzz: optional(&info.fuzz, "abs_info.info.fuzz")?,
                flat: optional(&info.flat, "abs_info.info.flat")?,
                resolution: optional(&info.resolution, "abs_info.info.resolution")?,
            },
        );
    }
    Ok(axes)
}

fn injections(values: &[Scalar]) -> Result<Vec<RawEvent>, String> {
    if values.len() % 3 != 0 {
        return Err(format!(
            "`events` must hold (type, code, value) triples, got {} values",
            values.len()
        ));
    }
    values
        .chunks_exact(3)
        .map(|triple| {
            Ok(RawEvent::new(
                int(&triple[0], "events")?,
                int(&triple[1], "events")?,
                int(&triple[2], "events")?,
            ))
        })
        .collect()
}

impl RawCommand {
    fn into_event(self) -> Result<Event, String> {
        let id: DeviceId = required(&self.id, "id")?;
        let name = self.command.as_deref().ok_or_else(|| missing("command"))?;
        let command =
            Command::from_name(name).ok_or_else(|| format!("unknown command `{}`", name))?;

        let body = match command {
            Command::Register => EventBody::Register(Registration {
                name: self.name.clone().ok_or_else(|| missing("name"))?,
                vendor_id: required(&self.vid, "vid")?,
                product_id: required(&self.pid, "pid")?,
                version_id: optional(&self.version, "version")?,
                bus: bus(&self.bus)?,
                configuration: configuration(self.configuration.as_deref().unwrap_or(&[]))?,
                ff_effects_max: optional(&self.ff_effects_max, "ff_effects_max")?,
                abs_info: abs_info(self.abs_info.as_deref().unwrap_or(&[]))?,
                port: self.port.clone(),
            }),
            Command::Inject => {
                let events = self.events.as_deref().ok_or_else(|| missing("events"))?;
                EventBody::Inject(injections(events)?)
            }
            Command::Delay => EventBody::Delay(required(&self.duration, "duration")?),
            Command::Sync => {
                EventBody::Sync(self.sync_token.clone().ok_or_else(|| missing("syncToken"))?)
            }
        };
        Ok(Event::new(id, body))
    }
}

/// Parser for scripts written as a stream of JSON command objects.
///
/// Top-level values are pulled from the reader one at a time. A top-level array is expanded
/// into its elements, so both `{...} {...}` and `[{...}, {...}]` are accepted.
pub struct JsonParser<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Value>,
    pending: VecDeque<Value>,
    index: usize,
    done: bool,
}

impl<R: Read> JsonParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(reader).into_iter(),
            pending: VecDeque::new(),
            index: 0,
            done: false,
        }
    }

    fn syntax_error(&mut self, err: serde_json::Error) -> ParseError {
        self.done = true;
        if err.classify() == Category::Io {
            return ParseError::Io(err.into());
        }
        let location = if err.classify() == Category::Eof {
            Location::EndOfInput
        } else {
            Location::Line {
                line: err.line(),
                column: err.column(),
            }
        };
        let message = err.to_string();
        let reason = message
            .split(" at line ")
            .next()
            .unwrap_or(&message)
            .to_string();
        ParseError::malformed(Dialect::Json, location, reason)
    }

    fn next_value(&mut self) -> Result<Option<Value>, ParseError> {
        loop {
            if let Some(value) = self.pending.pop_front() {
                return Ok(Some(value));
            }
            if self.done {
                return Ok(None);
            }
            match self.stream.next() {
                None => {
                    self.done = true;
                    return Ok(None);
                }
                Some(Err(err)) => return Err(self.syntax_error(err)),
                Some(Ok(Value::Array(values))) => {
                    trace!("Expanding top-level array of {} commands", values.len());
                    self.pending.extend(values);
                }
                Some(Ok(value)) => return Ok(Some(value)),
            }
        }
    }
}

impl<R: Read> EventSource for JsonParser<R> {
    fn next_event(&mut self) -> Result<Option<Event>, ParseError> {
        let Some(value) = self.next_value()? else {
            return Ok(None);
        };
        let location = Location::Entry {
            index: self.index,
            offset: self.stream.byte_offset(),
        };
        self.index += 1;

        let reason = match value {
            Value::Object(_) => match serde_json::from_value::<RawCommand>(value) {
                Ok(raw) => match raw.into_event() {
                    Ok(event) => {
                        trace!("Parsed {} for device {}", event.command(), event.id);
                        return Ok(Some(event));
                    }
                    Err(reason) => reason,
                },
                Err(err) => err.to_string(),
            },
            other => format!("expected a command object, found {}", kind_of(&other)),
        };
        self.done = true;
        self.pending.clear();
        Err(ParseError::malformed(Dialect::Json, location, reason))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
