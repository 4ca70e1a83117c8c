//! Symbolic names for input event constants.
//!
//! Scripts may spell numeric fields as the names used in `linux/input-event-codes.h`
//! (`EV_KEY`, `KEY_A`, `ABS_MT_SLOT`, ...). Names are resolved through the `evdev` code types;
//! only the uinput setter names used by configuration entries are kept here.

use evdev::{
    AbsoluteAxisCode, BusType, EventType, FFEffectCode, KeyCode, LedCode, MiscCode, PropType,
    RelativeAxisCode, SoundCode, SwitchCode, SynchronizationCode,
};
use std::str::FromStr;

const UINPUT_SETTERS: &[(&str, i32)] = &[
    ("UI_SET_EVBIT", 100),
    ("UI_SET_KEYBIT", 101),
    ("UI_SET_RELBIT", 102),
    ("UI_SET_ABSBIT", 103),
    ("UI_SET_MSCBIT", 104),
    ("UI_SET_LEDBIT", 105),
    ("UI_SET_SNDBIT", 106),
    ("UI_SET_FFBIT", 107),
    ("UI_SET_PHYS", 108),
    ("UI_SET_SWBIT", 109),
    ("UI_SET_PROPBIT", 110),
];

// evdev names event types by what they carry rather than by their EV_ suffix
const EVENT_TYPES: &[(&str, &str)] = &[
    ("SYN", "SYNCHRONIZATION"),
    ("KEY", "KEY"),
    ("REL", "RELATIVE"),
    ("ABS", "ABSOLUTE"),
    ("MSC", "MISC"),
    ("SW", "SWITCH"),
    ("LED", "LED"),
    ("SND", "SOUND"),
    ("REP", "REPEAT"),
    ("FF", "FORCEFEEDBACK"),
    ("PWR", "POWER"),
    ("FF_STATUS", "FORCEFEEDBACKSTATUS"),
];

fn parse<T: FromStr>(name: &str, raw: impl Fn(T) -> u16) -> Option<i32> {
    T::from_str(name).ok().map(|value| i32::from(raw(value)))
}

fn event_type(suffix: &str) -> Option<i32> {
    let (_, evdev_name) = EVENT_TYPES.iter().find(|(kernel, _)| *kernel == suffix)?;
    parse(evdev_name, |t: EventType| t.0)
}

/// Look up the numeric value of a symbolic constant
pub fn lookup(name: &str) -> Option<i32> {
    let (prefix, rest) = name.split_once('_')?;
    match prefix {
        "EV" => event_type(rest),
        "SYN" => parse(name, |c: SynchronizationCode| c.0),
        "KEY" | "BTN" => parse(name, |c: KeyCode| c.0),
        "REL" => parse(name, |c: RelativeAxisCode| c.0),
        "ABS" => parse(name, |c: AbsoluteAxisCode| c.0),
        "MSC" => parse(name, |c: MiscCode| c.0),
        "SW" => parse(name, |c: SwitchCode| c.0),
        "LED" => parse(name, |c: LedCode| c.0),
        "SND" => parse(name, |c: SoundCode| c.0),
        "FF" => parse(name, |c: FFEffectCode| c.0),
        "BUS" => parse(name, |b: BusType| b.0),
        "INPUT" => parse(rest.strip_prefix("PROP_")?, |p: PropType| p.0),
        "UI" => UINPUT_SETTERS
            .iter()
            .find(|(setter, _)| *setter == name)
            .map(|&(_, value)| value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names_across_families() {
        assert_eq!(lookup("EV_KEY"), Some(1));
        assert_eq!(lookup("EV_FF"), Some(0x15));
        assert_eq!(lookup("SYN_REPORT"), Some(0));
        assert_eq!(lookup("KEY_A"), Some(30));
        assert_eq!(lookup("BTN_SOUTH"), Some(0x130));
        assert_eq!(lookup("REL_WHEEL"), Some(0x08));
        assert_eq!(lookup("ABS_MT_POSITION_X"), Some(0x35));
        assert_eq!(lookup("FF_RUMBLE"), Some(0x50));
        assert_eq!(lookup("BUS_BLUETOOTH"), Some(0x05));
        assert_eq!(lookup("INPUT_PROP_DIRECT"), Some(0x01));
        assert_eq!(lookup("UI_SET_ABSBIT"), Some(103));
    }

    #[test]
    fn resolves_codes_outside_the_common_set() {
        assert_eq!(lookup("BTN_TRIGGER_HAPPY1"), Some(0x2c0));
        assert_eq!(lookup("KEY_FN"), Some(0x1d0));
    }

    #[test]
    fn every_event_type_alias_resolves() {
        for (kernel, _) in EVENT_TYPES {
            let name = format!("EV_{}", kernel);
            assert!(lookup(&name).is_some(), "{} did not resolve", name);
        }
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert_eq!(lookup("KEY_NOT_A_KEY"), None);
        assert_eq!(lookup("key_a"), None);
        assert_eq!(lookup("EV_BOGUS"), None);
        assert_eq!(lookup("INPUT_DIRECT"), None);
        assert_eq!(lookup("UI_SET_NOTHING"), None);
        assert_eq!(lookup("NOUNDERSCORE"), None);
    }
}
