mod common;

use common::{Call, replay};
use uireplay::parser::{self, EvemuParser, collect_events};
use uireplay::{
    BusType, ConfigEntry, ConfigKind, Dialect, EV_KEY, EV_SYN, EventBody, Location, ParseError,
    RawEvent,
};

const HEADER: &str = "\
# EVEMU 1.3
# Kernel: 6.1.0
N: test-kbd
I: 0003 1234 5678 0111
P: 00 00 00 00 00 00 00 00
B: 00 0b 00 00 00 00 00 00 00
B: 01 00 00 00 40 00 00 00 00
B: 02 00 00 00 00 00 00 00 00
B: 03 03 00 00 00 00 00 00 00
A: 00 0 255 0 0 0
A: 01 -127 127 2 8
";

fn press(ts: &str, value: i32) -> String {
    format!("E: {ts} 0001 001e {value}\nE: {ts} 0000 0000 0000\n")
}

fn bodies(input: &str) -> Vec<EventBody> {
    collect_events(&mut EvemuParser::new(input.as_bytes()))
        .unwrap()
        .into_iter()
        .map(|e| {
            assert_eq!(e.id, 1);
            e.body
        })
        .collect()
}

fn frame(value: i32) -> EventBody {
    EventBody::Inject(vec![RawEvent::new(EV_KEY, 30, value), RawEvent::new(EV_SYN, 0, 0)])
}

#[test]
fn header_becomes_one_registration() {
    let events = bodies(HEADER);
    assert_eq!(events.len(), 1);
    let EventBody::Register(reg) = &events[0] else {
        panic!("expected register, got {:?}", events[0]);
    };
    assert_eq!(reg.name, "test-kbd");
    assert_eq!(reg.bus, BusType::Usb);
    assert_eq!((reg.vendor_id, reg.product_id, reg.version_id), (0x1234, 0x5678, 0x111));
    assert_eq!(
        reg.configuration,
        vec![
            ConfigEntry { kind: ConfigKind::EvBit, codes: vec![0, 1, 3] },
            ConfigEntry { kind: ConfigKind::KeyBit, codes: vec![30] },
            ConfigEntry { kind: ConfigKind::AbsBit, codes: vec![0, 1] },
        ]
    );
    assert_eq!(reg.ff_effects_max, 0);
    assert_eq!(reg.abs_info[&0].maximum, 255);
    assert_eq!(reg.abs_info[&1].minimum, -127);
    assert_eq!(reg.abs_info[&1].flat, 8);
    assert_eq!(reg.abs_info[&1].resolution, 0);
}

#[test]
fn frames_end_at_syn_report() {
    let input = format!("{HEADER}{}{}", press("0.000000", 1), press("0.000000", 0));
    let events = bodies(&input);
    assert_eq!(events[1..], [frame(1), frame(0)]);
}

#[test]
fn gaps_become_delays_with_carried_remainder() {
    let input = format!(
        "{HEADER}{}{}{}{}",
        press("1.000000", 1),
        press("1.000500", 0),
        press("1.010700", 1),
        press("1.021000", 0),
    );
    let events = bodies(&input);
    assert_eq!(
        events[1..],
        [
            frame(1),
            // 0.5 ms is below the threshold
            frame(0),
            EventBody::Delay(10),
            frame(1),
            // 0.7 ms carried over from the previous gap
            EventBody::Delay(11),
            frame(0),
        ]
    );
}

#[test]
fn backwards_timestamps_restart_the_clock() {
    let input = format!(
        "{HEADER}{}{}{}",
        press("5.000000", 1),
        press("2.000000", 0),
        press("2.003000", 1),
    );
    let events = bodies(&input);
    assert_eq!(
        events[1..],
        [frame(1), frame(0), EventBody::Delay(3), frame(1)]
    );
}

#[test]
fn trailing_frame_without_syn_is_flushed() {
    let input = format!("{HEADER}E: 0.000000 0001 001e 1\n");
    let events = bodies(&input);
    assert_eq!(
        events[1..],
        [EventBody::Inject(vec![RawEvent::new(EV_KEY, 30, 1)])]
    );
}

#[test]
fn comments_between_events_are_skipped() {
    let input = format!(
        "{HEADER}{}# between frames\n\n{}",
        press("0.000000", 1),
        press("0.000000", 0)
    );
    assert_eq!(bodies(&input)[1..], [frame(1), frame(0)]);
}

#[test]
fn force_feedback_bits_reserve_effect_slots() {
    let input = "N: wheel\nI: 0003 046d c24f 0111\nB: 15 00 00 00 00 00 00 00 00 00 00 01\n";
    let events = bodies(input);
    let EventBody::Register(reg) = &events[0] else {
        panic!("expected register");
    };
    assert_eq!(reg.configuration[0].kind, ConfigKind::FfBit);
    assert_eq!(reg.configuration[0].codes, vec![0x50]);
    assert!(reg.ff_effects_max > 0);
}

#[test]
fn unexpected_line_after_header_is_malformed() {
    let input = format!("{HEADER}{}X: what\n", press("0.000000", 1));
    let err = collect_events(&mut EvemuParser::new(input.as_bytes())).unwrap_err();
    match err {
        ParseError::Malformed { dialect, location, .. } => {
            assert_eq!(dialect, Dialect::Evemu);
            // Header is 11 lines, then two event lines
            assert_eq!(location, Location::Line { line: 14, column: 1 });
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn missing_device_name_fails_at_end_of_input() {
    let input = "# EVEMU 1.3\nI: 0003 1234 5678 0111\n";
    let err = collect_events(&mut EvemuParser::new(input.as_bytes())).unwrap_err();
    match err {
        ParseError::Malformed { location, reason, .. } => {
            assert_eq!(location, Location::EndOfInput);
            assert!(reason.contains("N:"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn recording_replays_through_the_manager() {
    let input = format!("\n{HEADER}{}{}", press("0.000000", 1), press("0.002000", 0));

    let (dialect, _) = parser::open(input.as_bytes()).unwrap();
    assert_eq!(dialect, Dialect::Evemu);

    let run = replay(&input);
    run.result.unwrap();
    let calls = run.log.calls();
    assert!(matches!(&calls[0], Call::Create(1, reg) if reg.name == "test-kbd"));
    assert_eq!(
        calls[1..],
        [
            Call::Inject(1, vec![RawEvent::new(EV_KEY, 30, 1), RawEvent::new(EV_SYN, 0, 0)]),
            Call::Delay(1, 2),
            Call::Inject(1, vec![RawEvent::new(EV_KEY, 30, 0), RawEvent::new(EV_SYN, 0, 0)]),
            Call::Close(1),
        ]
    );
    assert_eq!(run.clock.sleeps(), vec![std::time::Duration::from_millis(2)]);
}
