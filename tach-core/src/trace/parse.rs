//! Reading a dump back from captured console text.
//!
//! The count line `<n> events logged` anchors the dump. The closest
//! non-empty line above it is the title, so chatter printed before the dump
//! is skipped. Word lines follow the count line up to the first line that
//! is not made of hex words, and their total must match the count.

use core::fmt;

use winnow::ModalResult;
use winnow::ascii::{dec_uint, hex_uint, space1};
use winnow::combinator::terminated;
use winnow::prelude::*;

use crate::edge::EdgeWord;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DumpParseError {
    /// No `<n> events logged` line was found.
    MissingCount,
    /// Nothing precedes the count line.
    MissingTitle,
    /// The word lines hold a different number of words than announced.
    CountMismatch { expected: usize, found: usize },
}

impl fmt::Display for DumpParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpParseError::MissingCount => f.write_str("no `<n> events logged` line"),
            DumpParseError::MissingTitle => f.write_str("no title above the event count"),
            DumpParseError::CountMismatch { expected, found } => {
                write!(f, "{expected} events announced, {found} words present")
            }
        }
    }
}

/// A dump read back from text.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedDump<'t, C> {
    pub title: &'t str,
    pub words: C,
}

fn count_line(input: &mut &str) -> ModalResult<usize> {
    terminated(dec_uint, (space1, "events", space1, "logged")).parse_next(input)
}

fn hex_word(input: &mut &str) -> ModalResult<u32> {
    hex_uint.parse_next(input)
}

fn is_word_line(line: &str) -> bool {
    !line.is_empty()
        && line
            .split_ascii_whitespace()
            .all(|token| hex_word.parse(token).is_ok())
}

/// Parses the first dump found in `text` into any collection of words.
///
/// # Errors
///
/// Fails when the count line or the title is missing, or when the number
/// of words differs from the count.
pub fn parse_dump<'t, C>(text: &'t str) -> Result<ParsedDump<'t, C>, DumpParseError>
where
    C: Default + Extend<EdgeWord>,
{
    let mut lines = text.lines().map(str::trim);
    let mut title = None;
    let expected = loop {
        let line = lines.next().ok_or(DumpParseError::MissingCount)?;
        if let Ok(count) = count_line.parse(line) {
            break count;
        }
        if !line.is_empty() {
            title = Some(line);
        }
    };
    let title = title.ok_or(DumpParseError::MissingTitle)?;

    let mut words = C::default();
    let mut found = 0;
    for line in lines.take_while(|line| is_word_line(line)) {
        for token in line.split_ascii_whitespace() {
            if let Ok(raw) = hex_word.parse(token) {
                words.extend(core::iter::once(EdgeWord::from_raw(raw)));
                found += 1;
            }
        }
    }

    if found != expected {
        return Err(DumpParseError::CountMismatch { expected, found });
    }
    Ok(ParsedDump { title, words })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::string::String;
    use std::vec::Vec;

    use portable_atomic::AtomicU32;

    use super::*;
    use crate::edge::{CaptureChannel, Edge, EdgeDirection};
    use crate::trace::TraceBuffer;

    #[test]
    fn written_dump_reads_back_word_for_word() {
        let slots: [AtomicU32; 20] = core::array::from_fn(|_| AtomicU32::new(0));
        let trace = TraceBuffer::new(&slots);
        trace.begin_recording();
        for step in 0..19_u32 {
            let channel = if step % 2 == 0 {
                CaptureChannel::Reference
            } else {
                CaptureChannel::Drive
            };
            trace.record(Edge::new(channel, EdgeDirection::Rising, step * 1_013).encode());
        }
        trace.end_recording();

        let mut text = String::from("queued ramp\r\n");
        trace.dump("Ramps scenario", &mut text).expect("string sink");

        let parsed: ParsedDump<'_, Vec<EdgeWord>> = parse_dump(&text).expect("valid dump");
        assert_eq!(parsed.title, "Ramps scenario");
        assert_eq!(parsed.words, trace.recorded().collect::<Vec<_>>());
    }

    #[test]
    fn trailing_chatter_ends_the_words() {
        let text = "Half speed scenario\n2 events logged\n5 a\ndone half-speed\n";
        let parsed: ParsedDump<'_, Vec<EdgeWord>> = parse_dump(text).expect("valid dump");
        assert_eq!(parsed.words, [EdgeWord::from_raw(5), EdgeWord::from_raw(0xa)]);
    }

    #[test]
    fn truncated_dump_is_reported() {
        let text = "Bang-bang scenario\n3 events logged\n1 5\n";
        let error = parse_dump::<Vec<EdgeWord>>(text).expect_err("short dump");
        assert_eq!(error, DumpParseError::CountMismatch { expected: 3, found: 2 });
    }

    #[test]
    fn headers_are_required() {
        assert_eq!(
            parse_dump::<Vec<EdgeWord>>("Ramps scenario\n1 5 9\n"),
            Err(DumpParseError::MissingCount)
        );
        assert_eq!(
            parse_dump::<Vec<EdgeWord>>("0 events logged\n"),
            Err(DumpParseError::MissingTitle)
        );
    }
}
