//! Text rendering of a finished trace session.
//!
//! A dump is the session title, a `<n> events logged` line, then every word
//! in lowercase hex, [`WORDS_PER_LINE`] per line. Rendering is line-at-a-time
//! so slow transports can yield between lines.

use core::fmt;

use heapless::Vec;

use super::RecordedEvents;
use crate::edge::EdgeWord;

/// Hex words printed on each dump line.
pub const WORDS_PER_LINE: usize = 8;

/// One line of dump output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DumpLine<'t> {
    Title(&'t str),
    Count(usize),
    Words(Vec<EdgeWord, WORDS_PER_LINE>),
}

impl fmt::Display for DumpLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpLine::Title(title) => f.write_str(title),
            DumpLine::Count(count) => write!(f, "{count} events logged"),
            DumpLine::Words(words) => {
                for (position, word) in words.iter().enumerate() {
                    if position > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{word:x}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Stage {
    Title,
    Count,
    Words,
}

/// Iterator produced by [`super::TraceBuffer::dump_lines`].
pub struct DumpLines<'b, 't> {
    title: &'t str,
    events: RecordedEvents<'b>,
    stage: Stage,
}

impl<'b, 't> DumpLines<'b, 't> {
    pub(super) fn new(title: &'t str, events: RecordedEvents<'b>) -> Self {
        Self {
            title,
            events,
            stage: Stage::Title,
        }
    }
}

impl<'t> Iterator for DumpLines<'_, 't> {
    type Item = DumpLine<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.stage {
            Stage::Title => {
                self.stage = Stage::Count;
                Some(DumpLine::Title(self.title))
            }
            Stage::Count => {
                self.stage = Stage::Words;
                Some(DumpLine::Count(self.events.len()))
            }
            Stage::Words => {
                let words: Vec<EdgeWord, WORDS_PER_LINE> =
                    self.events.by_ref().take(WORDS_PER_LINE).collect();
                if words.is_empty() {
                    None
                } else {
                    Some(DumpLine::Words(words))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::string::String;
    use std::vec::Vec as StdVec;

    use portable_atomic::AtomicU32;

    use crate::edge::{CaptureChannel, Edge, EdgeDirection};
    use crate::trace::TraceBuffer;

    #[test]
    fn dump_prints_title_count_and_eight_words_per_line() {
        let slots: [AtomicU32; 16] = core::array::from_fn(|_| AtomicU32::new(0));
        let trace = TraceBuffer::new(&slots);

        trace.begin_recording();
        for timestamp in 0..10 {
            let edge = Edge::new(CaptureChannel::Drive, EdgeDirection::Falling, timestamp);
            trace.record(edge.encode());
        }
        trace.end_recording();

        let mut out = String::new();
        trace
            .dump("Bang-bang scenario", &mut out)
            .expect("writing to a string cannot fail");

        let lines: StdVec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Bang-bang scenario");
        assert_eq!(lines[1], "10 events logged");
        assert_eq!(lines[2], "1 5 9 d 11 15 19 1d");
        assert_eq!(lines[3], "21 25");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn empty_session_dumps_header_only() {
        let slots: [AtomicU32; 4] = core::array::from_fn(|_| AtomicU32::new(0));
        let trace = TraceBuffer::new(&slots);

        let lines: StdVec<String> = trace
            .dump_lines("No scenario")
            .map(|line| std::format!("{line}"))
            .collect();
        assert_eq!(lines, ["No scenario", "0 events logged"]);
    }
}
