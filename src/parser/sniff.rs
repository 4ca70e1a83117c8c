use crate::error::Dialect;
use std::io::{self, BufRead, Cursor, Read};

fn is_line_separator(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

/// Decide which dialect `reader` holds.
///
/// Evemu recordings start, after zero or more empty lines, with `#` (version header or comment)
/// or `N` (device name). Anything else, including empty input, is treated as JSON. The returned
/// reader yields the full original input, separators included.
pub fn sniff<R: BufRead>(mut reader: R) -> io::Result<(Dialect, impl BufRead)> {
    let mut skipped = Vec::new();
    let first = loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break None;
        }
        match buf.iter().position(|&b| !is_line_separator(b)) {
            Some(pos) => {
                let first = buf[pos];
                skipped.extend_from_slice(&buf[..pos]);
                reader.consume(pos);
                break Some(first);
            }
            None => {
                let len = buf.len();
                skipped.extend_from_slice(buf);
                reader.consume(len);
            }
        }
    };

    let dialect = match first {
        Some(b'#') | Some(b'N') => Dialect::Evemu,
        _ => Dialect::Json,
    };
    Ok((dialect, Cursor::new(skipped).chain(reader)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff_str(input: &str) -> (Dialect, String) {
        let (dialect, mut reader) = sniff(input.as_bytes()).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        (dialect, rest)
    }

    #[test]
    fn evemu_markers_select_evemu() {
        assert_eq!(sniff_str("# EVEMU 1.3\n").0, Dialect::Evemu);
        assert_eq!(sniff_str("\n\r\nN: kbd\n").0, Dialect::Evemu);
    }

    #[test]
    fn anything_else_selects_json() {
        assert_eq!(sniff_str("{\"id\": 1}").0, Dialect::Json);
        assert_eq!(sniff_str("  # indented").0, Dialect::Json);
        assert_eq!(sniff_str("").0, Dialect::Json);
        assert_eq!(sniff_str("\n\n\n").0, Dialect::Json);
    }

    #[test]
    fn inspected_bytes_are_handed_back() {
        let input = "\n\nN: kbd\nI: 0003 0001 0002 0000\n";
        assert_eq!(sniff_str(input), (Dialect::Evemu, input.to_string()));
    }

    #[test]
    fn separators_spanning_buffer_refills_are_kept() {
        let input = format!("{}[]", "\n".repeat(20));
        let reader = io::BufReader::with_capacity(4, input.as_bytes());
        let (dialect, mut rest) = sniff(reader).unwrap();
        let mut out = String::new();
        rest.read_to_string(&mut out).unwrap();
        assert_eq!(dialect, Dialect::Json);
        assert_eq!(out, input);
    }
}
