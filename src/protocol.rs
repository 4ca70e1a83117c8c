use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub type DeviceId = i32;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;
pub const EV_FF: u16 = 0x15;
pub const SYN_REPORT: u16 = 0x00;

/// Command carried by an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Register,
    Inject,
    Delay,
    Sync,
}
impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "register" => Some(Command::Register),
            "inject" => Some(Command::Inject),
            "delay" => Some(Command::Delay),
            "sync" => Some(Command::Sync),
            _ => None,
        }
    }
}
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Register => "REGISTER",
            Command::Inject => "INJECT",
            Command::Delay => "DELAY",
            Command::Sync => "SYNC",
        };
        f.write_str(name)
    }
}

/// A single `(type, code, value)` input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}
impl RawEvent {
    pub const fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    /// Whether this is the `EV_SYN/SYN_REPORT` frame marker
    pub fn is_sync_report(&self) -> bool {
        self.event_type == EV_SYN && self.code == SYN_REPORT
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    Usb,
    Bluetooth,
    Virtual,
    Other(u16),
}
impl BusType {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x03 => BusType::Usb,
            0x05 => BusType::Bluetooth,
            0x06 => BusType::Virtual,
            other => BusType::Other(other),
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            BusType::Usb => 0x03,
            BusType::Bluetooth => 0x05,
            BusType::Virtual => 0x06,
            BusType::Other(raw) => raw,
        }
    }
}

/// uinput capability setter a configuration entry is applied with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfigKind {
    #[serde(rename = "UI_SET_EVBIT")]
    EvBit,
    #[serde(rename = "UI_SET_KEYBIT")]
    KeyBit,
    #[serde(rename = "UI_SET_RELBIT")]
    RelBit,
    #[serde(rename = "UI_SET_ABSBIT")]
    AbsBit,
    #[serde(rename = "UI_SET_MSCBIT")]
    MscBit,
    #[serde(rename = "UI_SET_LEDBIT")]
    LedBit,
    #[serde(rename = "UI_SET_SNDBIT")]
    SndBit,
    #[serde(rename = "UI_SET_FFBIT")]
    FfBit,
    #[serde(rename = "UI_SET_SWBIT")]
    SwBit,
    #[serde(rename = "UI_SET_PROPBIT")]
    PropBit,
}
impl ConfigKind {
    /// Resolve the numeric control code used in scripts (`UI_SET_EVBIT` = 100 ...)
    pub fn from_control_code(code: i64) -> Option<Self> {
        match code {
            100 => Some(ConfigKind::EvBit),
            101 => Some(ConfigKind::KeyBit),
            102 => Some(ConfigKind::RelBit),
            103 => Some(ConfigKind::AbsBit),
            104 => Some(ConfigKind::MscBit),
            105 => Some(ConfigKind::LedBit),
            106 => Some(ConfigKind::SndBit),
            107 => Some(ConfigKind::FfBit),
            109 => Some(ConfigKind::SwBit),
            110 => Some(ConfigKind::PropBit),
            _ => None,
        }
    }

    /// Setter for the codes of an event type, as listed by evemu `B:` lines
    pub fn for_event_type(event_type: u16) -> Option<Self> {
        match event_type {
            0x00 => Some(ConfigKind::EvBit),
            0x01 => Some(ConfigKind::KeyBit),
            0x02 => Some(ConfigKind::RelBit),
            0x03 => Some(ConfigKind::AbsBit),
            0x04 => Some(ConfigKind::MscBit),
            0x05 => Some(ConfigKind::SwBit),
            0x11 => Some(ConfigKind::LedBit),
            0x12 => Some(ConfigKind::SndBit),
            0x15 => Some(ConfigKind::FfBit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub kind: ConfigKind,
    pub codes: Vec<u16>,
}

/// Absolute axis calibration, laid out like the kernel's `input_absinfo`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

/// Everything needed to create a virtual device in one go
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version_id: u16,
    pub bus: BusType,
    pub configuration: Vec<ConfigEntry>,
    pub ff_effects_max: u32,
    pub abs_info: BTreeMap<u16, AbsInfo>,
    pub port: Option<String>,
}
impl Registration {
    pub fn new(name: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            name: name.into(),
            vendor_id,
            product_id,
            version_id: 0,
            bus: BusType::default(),
            configuration: Vec::new(),
            ff_effects_max: 0,
            abs_info: BTreeMap::new(),
            port: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventBody {
    Register(Registration),
    Inject(Vec<RawEvent>),
    /// Milliseconds
    Delay(u64),
    Sync(String),
}

/// One script command addressed to a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: DeviceId,
    pub body: EventBody,
}
impl Event {
    pub fn new(id: DeviceId, body: EventBody) -> Self {
        Self { id, body }
    }

    pub fn command(&self) -> Command {
        match self.body {
            EventBody::Register(_) => Command::Register,
            EventBody::Inject(_) => Command::Inject,
            EventBody::Delay(_) => Command::Delay,
            EventBody::Sync(_) => Command::Sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_follows_body() {
        let event = Event::new(3, EventBody::Delay(10));
        assert_eq!(event.command(), Command::Delay);
        assert_eq!(event.command().to_string(), "DELAY");
    }

    #[test]
    fn bus_type_round_trips_known_and_unknown_values() {
        assert_eq!(BusType::from_raw(0x05), BusType::Bluetooth);
        assert_eq!(BusType::from_raw(0x18), BusType::Other(0x18));
        assert_eq!(BusType::Other(0x18).to_raw(), 0x18);
    }

    #[test]
    fn command_names_are_case_insensitive() {
        assert_eq!(Command::from_name("Inject"), Some(Command::Inject));
        assert_eq!(Command::from_name("updateTimeBase"), None);
    }
}
