//! Bounded edge trace shared between the capture interrupt and the consumer.
//!
//! The buffer never allocates. Storage is a caller-provided slice of atomics,
//! normally a `static` sized from a [`TraceCapacity`], so the interrupt can
//! append without taking a lock. Appends are gated by the recording flag and
//! the write index; anything arriving while disabled or after the buffer
//! fills is dropped. A trace may also be restricted to one capture channel,
//! in which case edges on the other channel are never stored.
//!
//! Session start and stop run inside a critical section so the index reset
//! and the flag flip land together with respect to a single producer. An
//! append already past its flag check when recording stops may still land;
//! at most one boundary event is affected.

use core::fmt;

use portable_atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::edge::{CaptureChannel, EdgeWord};

mod dump;
mod parse;
mod stats;

pub use dump::{DumpLine, DumpLines, WORDS_PER_LINE};
pub use parse::{DumpParseError, ParsedDump, parse_dump};
pub use stats::{DirectionStats, LineStats, TraceStats};

/// Event rate the trace is sized for on the reference bench.
pub const DEFAULT_EVENTS_PER_SECOND: u32 = 52_000;
/// Longest recording session the trace is sized for on the reference bench.
pub const DEFAULT_MAX_SECONDS: u32 = 30;

/// Sizing policy for trace storage.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TraceCapacity {
    /// Expected edge rate while recording.
    pub events_per_second: u32,
    /// Longest session that must fit.
    pub seconds: u32,
}

impl TraceCapacity {
    #[must_use]
    pub const fn new(events_per_second: u32, seconds: u32) -> Self {
        Self {
            events_per_second,
            seconds,
        }
    }

    /// Number of events the policy requires.
    #[must_use]
    pub const fn events(self) -> usize {
        self.events_per_second as usize * self.seconds as usize
    }
}

impl Default for TraceCapacity {
    fn default() -> Self {
        Self::new(DEFAULT_EVENTS_PER_SECOND, DEFAULT_MAX_SECONDS)
    }
}

/// Errors raised while wiring trace storage at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TraceSetupError {
    /// The provided storage cannot hold the requested capacity.
    StorageTooSmall { required: usize, available: usize },
}

impl fmt::Display for TraceSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceSetupError::StorageTooSmall {
                required,
                available,
            } => write!(
                f,
                "trace storage holds {available} events, {required} required"
            ),
        }
    }
}

/// Fixed-capacity, append-only event trace.
pub struct TraceBuffer<'a> {
    storage: &'a [AtomicU32],
    index: AtomicUsize,
    enabled: AtomicBool,
    only: Option<CaptureChannel>,
}

impl<'a> TraceBuffer<'a> {
    /// Creates a disabled, empty trace over `storage`. Capacity is
    /// `storage.len()`.
    #[must_use]
    pub const fn new(storage: &'a [AtomicU32]) -> Self {
        Self {
            storage,
            index: AtomicUsize::new(0),
            enabled: AtomicBool::new(false),
            only: None,
        }
    }

    /// Stores only edges captured on `channel`. Edges on the other channel
    /// are dropped by [`Self::record`].
    #[must_use]
    pub const fn only_channel(mut self, channel: CaptureChannel) -> Self {
        self.only = Some(channel);
        self
    }

    /// Channel this trace is restricted to, if any.
    #[must_use]
    pub const fn recorded_channel(&self) -> Option<CaptureChannel> {
        self.only
    }

    /// Creates a trace holding exactly `capacity.events()` entries of
    /// `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceSetupError::StorageTooSmall`] when `storage` is shorter
    /// than the capacity requires.
    pub fn with_capacity(
        storage: &'a [AtomicU32],
        capacity: TraceCapacity,
    ) -> Result<Self, TraceSetupError> {
        let required = capacity.events();
        match storage.get(..required) {
            Some(slots) => Ok(Self::new(slots)),
            None => Err(TraceSetupError::StorageTooSmall {
                required,
                available: storage.len(),
            }),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of events appended since the last [`Self::begin_recording`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.load(Ordering::Acquire).min(self.storage.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Appends `word` if a session is active, the word's channel is
    /// recorded and capacity remains.
    ///
    /// Safe to call from interrupt context: it never blocks and never
    /// reports failure beyond the returned flag. Assumes a single producer.
    pub fn record(&self, word: EdgeWord) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        if let Some(channel) = self.only
            && word.channel() != channel
        {
            return false;
        }

        let index = self.index.load(Ordering::Relaxed);
        let Some(slot) = self.storage.get(index) else {
            return false;
        };

        slot.store(word.raw(), Ordering::Relaxed);
        self.index.store(index + 1, Ordering::Release);
        true
    }

    /// Starts a new session: discards prior content and enables appends.
    pub fn begin_recording(&self) {
        critical_section::with(|_| {
            self.index.store(0, Ordering::Relaxed);
            self.enabled.store(true, Ordering::Release);
        });
    }

    /// Stops the current session. Content is stable once this returns.
    pub fn end_recording(&self) {
        critical_section::with(|_| {
            self.enabled.store(false, Ordering::Release);
        });
    }

    /// Iterates the recorded events in append order.
    ///
    /// # Panics
    ///
    /// Panics if a session is still active.
    #[must_use]
    pub fn recorded(&self) -> RecordedEvents<'_> {
        assert!(
            !self.is_recording(),
            "trace read while a recording session is active"
        );
        let len = self.len();
        RecordedEvents {
            slots: self.storage[..len].iter(),
        }
    }

    /// Line-by-line dump of the last session, headed by `title`.
    ///
    /// # Panics
    ///
    /// Panics if a session is still active.
    #[must_use]
    pub fn dump_lines<'t>(&self, title: &'t str) -> DumpLines<'_, 't> {
        DumpLines::new(title, self.recorded())
    }

    /// Writes the full dump of the last session into `out`.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `out`.
    ///
    /// # Panics
    ///
    /// Panics if a session is still active.
    pub fn dump<W: fmt::Write>(&self, title: &str, out: &mut W) -> fmt::Result {
        for line in self.dump_lines(title) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

/// Iterator over the words of a finished session.
#[derive(Clone)]
pub struct RecordedEvents<'b> {
    slots: core::slice::Iter<'b, AtomicU32>,
}

impl Iterator for RecordedEvents<'_> {
    type Item = EdgeWord;

    fn next(&mut self) -> Option<Self::Item> {
        self.slots
            .next()
            .map(|slot| EdgeWord::from_raw(slot.load(Ordering::Relaxed)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for RecordedEvents<'_> {}
