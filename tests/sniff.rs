//! Property tests for dialect sniffing.
//!
//! The sniffer must pick the same dialect for the same bytes, and the reader it hands back must
//! yield those bytes unchanged, whatever the buffer size of the underlying reader.

use proptest::prelude::*;
use std::io::{BufReader, Read};
use uireplay::Dialect;
use uireplay::parser::sniff;

fn sniff_all(bytes: &[u8], capacity: usize) -> (Dialect, Vec<u8>) {
    let (dialect, mut reader) = sniff(BufReader::with_capacity(capacity, bytes)).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    (dialect, out)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn sniffing_preserves_input(bytes in proptest::collection::vec(any::<u8>(), 0..256), capacity in 1usize..64) {
        let (dialect, out) = sniff_all(&bytes, capacity);
        prop_assert_eq!(&out, &bytes);

        let (again, _) = sniff_all(&bytes, 8192);
        prop_assert_eq!(dialect, again);
    }

    #[test]
    fn leading_line_breaks_are_skipped(breaks in "[\r\n]{0,40}", evemu in any::<bool>(), rest in "[ -~]{0,40}") {
        let first = if evemu { "N" } else { "{" };
        let input = format!("{breaks}{first}{rest}");
        let (dialect, out) = sniff_all(input.as_bytes(), 4);
        prop_assert_eq!(dialect, if evemu { Dialect::Evemu } else { Dialect::Json });
        prop_assert_eq!(out, input.into_bytes());
    }
}

#[test]
fn empty_input_is_json() {
    assert_eq!(sniff_all(b"", 16), (Dialect::Json, Vec::new()));
    assert_eq!(sniff_all(b"\n\r\n", 2), (Dialect::Json, b"\n\r\n".to_vec()));
}
