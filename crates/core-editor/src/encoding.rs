//! Charset detection and line-terminator handling.
//!
//! Files are read whole, sniffed, decoded, then split on any of `\n`,
//! `\r\n`, `\r`. The dominant terminator (first seen wins ties) becomes
//! the buffer's `format` and is reproduced on write.
//!
//! Detection is a byte-histogram heuristic: BOMs first, then strict UTF-8
//! validation, then NUL placement for the UTF-16 variants, otherwise
//! windows-1252. An empty or pure-ASCII file is UTF-8, which keeps the
//! result platform-independent.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Line-ending convention of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Unix,
    Dos,
    Mac,
}

impl LineEnding {
    pub fn terminator(self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Dos => "\r\n",
            LineEnding::Mac => "\r",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LineEnding::Unix => "unix",
            LineEnding::Dos => "dos",
            LineEnding::Mac => "mac",
        }
    }
}

/// Sniff the encoding of raw file bytes.
pub fn detect_charset(bytes: &[u8]) -> &'static Encoding {
    if bytes.starts_with(&[0xef, 0xbb, 0xbf]) {
        return UTF_8;
    }
    if bytes.starts_with(&[0xff, 0xfe]) {
        return UTF_16LE;
    }
    if bytes.starts_with(&[0xfe, 0xff]) {
        return UTF_16BE;
    }
    // NUL placement comes before UTF-8 validation: U+0000 is valid UTF-8,
    // but NULs in text bytes mean UTF-16 far more often than not.
    let nuls_even = bytes.iter().step_by(2).filter(|&&b| b == 0).count();
    let nuls_odd = bytes.iter().skip(1).step_by(2).filter(|&&b| b == 0).count();
    let half = bytes.len() / 2;
    if half > 0 {
        if nuls_odd * 4 >= half * 3 && nuls_even == 0 {
            return UTF_16LE;
        }
        if nuls_even * 4 >= half * 3 && nuls_odd == 0 {
            return UTF_16BE;
        }
    }
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    WINDOWS_1252
}

/// Decode bytes and split into terminator-free lines, reporting the
/// dominant line ending.
pub fn decode_lines(bytes: &[u8], charset: &'static Encoding) -> (Vec<String>, LineEnding) {
    let (text, _, _) = charset.decode(bytes);
    split_lines(&text)
}

pub fn split_lines(text: &str) -> (Vec<String>, LineEnding) {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut counts = [0usize; 3]; // unix, dos, mac
    let mut first: Option<LineEnding> = None;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                let ending = if chars.peek() == Some(&'\n') {
                    chars.next();
                    LineEnding::Dos
                } else {
                    LineEnding::Mac
                };
                counts[ending as usize] += 1;
                first.get_or_insert(ending);
                lines.push(std::mem::take(&mut current));
            }
            '\n' => {
                counts[LineEnding::Unix as usize] += 1;
                first.get_or_insert(LineEnding::Unix);
                lines.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    lines.push(current);
    let format = dominant(&counts, first);
    (lines, format)
}

fn dominant(counts: &[usize; 3], first: Option<LineEnding>) -> LineEnding {
    let first = first.unwrap_or(LineEnding::Unix);
    let max = *counts.iter().max().unwrap();
    if max == 0 {
        return LineEnding::Unix;
    }
    // First-seen breaks ties and wins when it shares the maximum.
    if counts[first as usize] == max {
        return first;
    }
    match counts.iter().position(|&c| c == max).unwrap() {
        0 => LineEnding::Unix,
        1 => LineEnding::Dos,
        _ => LineEnding::Mac,
    }
}

/// Join lines under `format` and encode with `charset`.
pub fn encode_lines(
    lines: &[String],
    format: LineEnding,
    charset: &'static Encoding,
) -> Vec<u8> {
    let joined = lines.join(format.terminator());
    charset.encode(&joined).0.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_ascii_are_utf8() {
        assert_eq!(detect_charset(b""), UTF_8);
        assert_eq!(detect_charset(b"plain ascii\n"), UTF_8);
    }

    #[test]
    fn utf8_multibyte_detected() {
        assert_eq!(detect_charset("héllo wörld".as_bytes()), UTF_8);
    }

    #[test]
    fn bom_wins() {
        assert_eq!(detect_charset(&[0xef, 0xbb, 0xbf, b'x']), UTF_8);
        assert_eq!(detect_charset(&[0xff, 0xfe, b'x', 0]), UTF_16LE);
        assert_eq!(detect_charset(&[0xfe, 0xff, 0, b'x']), UTF_16BE);
    }

    #[test]
    fn nul_histogram_finds_utf16() {
        let le: Vec<u8> = "terminal text here"
            .bytes()
            .flat_map(|b| [b, 0])
            .collect();
        assert_eq!(detect_charset(&le), UTF_16LE);
        let be: Vec<u8> = "terminal text here"
            .bytes()
            .flat_map(|b| [0, b])
            .collect();
        assert_eq!(detect_charset(&be), UTF_16BE);
    }

    #[test]
    fn high_bytes_fall_back_to_windows_1252() {
        assert_eq!(detect_charset(&[b'c', b'a', b'f', 0xe9]), WINDOWS_1252);
    }

    #[test]
    fn split_mixed_terminators() {
        let (lines, format) = split_lines("a\nb\r\nc\rd");
        assert_eq!(lines, vec!["a", "b", "c", "d"]);
        assert_eq!(format, LineEnding::Unix); // first seen wins the tie
    }

    #[test]
    fn dominant_format_detected() {
        let (_, format) = split_lines("a\r\nb\r\nc\nd\r\n");
        assert_eq!(format, LineEnding::Dos);
    }

    #[test]
    fn trailing_newline_yields_empty_last_line() {
        let (lines, _) = split_lines("a\nb\n");
        assert_eq!(lines, vec!["a", "b", ""]);
    }

    #[test]
    fn encode_dos_format_exact_bytes() {
        let lines = vec!["a".to_string(), "b".to_string(), String::new()];
        let bytes = encode_lines(&lines, LineEnding::Dos, UTF_8);
        assert_eq!(bytes, &[0x61, 0x0d, 0x0a, 0x62, 0x0d, 0x0a]);
    }

    #[test]
    fn decode_encode_round_trip_preserves_format() {
        let input = b"one\r\ntwo\r\n";
        let charset = detect_charset(input);
        let (lines, format) = decode_lines(input, charset);
        assert_eq!(format, LineEnding::Dos);
        assert_eq!(encode_lines(&lines, format, charset), input);
    }

    #[test]
    fn windows_1252_round_trip() {
        let input = &[b'c', b'a', b'f', 0xe9];
        let charset = detect_charset(input);
        let (lines, format) = decode_lines(input, charset);
        assert_eq!(lines, vec!["café"]);
        assert_eq!(encode_lines(&lines, format, charset), input);
    }
}
