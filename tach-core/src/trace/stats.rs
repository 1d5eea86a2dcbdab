//! Per-line timing summary of a recorded session.
//!
//! Each capture channel is checked on its own. Edges are expected to
//! alternate direction and to move forward in time; anything else is
//! counted rather than rejected. Periods are measured between consecutive
//! edges of the same direction. Duty is the high share of complete
//! rising-falling-rising cycles. All intervals are taken modulo the timestamp
//! width.

use crate::edge::{CaptureChannel, EdgeDirection, EdgeWord, TIMESTAMP_MASK, elapsed_ticks};

/// Intervals longer than this are treated as an edge captured out of order.
const BACKWARD_THRESHOLD: u32 = TIMESTAMP_MASK / 2;

/// Period summary for one (channel, direction) pair, in capture ticks.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DirectionStats {
    pub edges: usize,
    pub periods: usize,
    pub min_period: u32,
    pub max_period: u32,
    pub total_period: u64,
}

impl DirectionStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_period(&self) -> Option<f64> {
        (self.periods > 0).then(|| self.total_period as f64 / self.periods as f64)
    }

    fn add_period(&mut self, ticks: u32) {
        if self.periods == 0 {
            self.min_period = ticks;
            self.max_period = ticks;
        } else {
            self.min_period = self.min_period.min(ticks);
            self.max_period = self.max_period.max(ticks);
        }
        self.periods += 1;
        self.total_period += u64::from(ticks);
    }
}

/// Summary of one capture channel.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LineStats {
    pub rising: DirectionStats,
    pub falling: DirectionStats,
    /// Ticks spent high within complete cycles.
    pub high_ticks: u64,
    /// Length of every complete cycle, summed.
    pub cycle_ticks: u64,
    /// Edges that appear earlier than the edge before them.
    pub out_of_order: usize,
    /// Edges with the same direction as the edge before them.
    pub repeated_direction: usize,
    last: Option<(EdgeDirection, u32)>,
    last_rising: Option<u32>,
    last_falling: Option<u32>,
}

impl LineStats {
    #[must_use]
    pub fn edges(&self) -> usize {
        self.rising.edges + self.falling.edges
    }

    #[must_use]
    pub fn direction(&self, direction: EdgeDirection) -> &DirectionStats {
        match direction {
            EdgeDirection::Rising => &self.rising,
            EdgeDirection::Falling => &self.falling,
        }
    }

    /// High time over cycle time, once a complete cycle was observed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duty(&self) -> Option<f64> {
        (self.cycle_ticks > 0).then(|| self.high_ticks as f64 / self.cycle_ticks as f64)
    }

    fn observe(&mut self, direction: EdgeDirection, timestamp: u32) {
        let previous_same = match direction {
            EdgeDirection::Rising => self.last_rising.replace(timestamp),
            EdgeDirection::Falling => self.last_falling.replace(timestamp),
        };
        let stats = match direction {
            EdgeDirection::Rising => &mut self.rising,
            EdgeDirection::Falling => &mut self.falling,
        };
        stats.edges += 1;

        let last = self.last.replace((direction, timestamp));
        if let Some((last_direction, last_timestamp)) = last {
            if elapsed_ticks(last_timestamp, timestamp) > BACKWARD_THRESHOLD {
                self.out_of_order += 1;
                return;
            }
            if last_direction == direction {
                self.repeated_direction += 1;
            }
        }

        let Some(previous) = previous_same else {
            return;
        };
        let period = elapsed_ticks(previous, timestamp);
        if period > BACKWARD_THRESHOLD {
            return;
        }
        stats.add_period(period);

        if direction == EdgeDirection::Rising
            && let Some((EdgeDirection::Falling, fall)) = last
        {
            let high = elapsed_ticks(previous, fall);
            if high <= period {
                self.high_ticks += u64::from(high);
                self.cycle_ticks += u64::from(period);
            }
        }
    }
}

/// Timing summary of every capture channel in a session.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TraceStats {
    lines: [LineStats; CaptureChannel::COUNT],
}

impl TraceStats {
    /// Summarises `words` in capture order.
    #[must_use]
    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator<Item = EdgeWord>,
    {
        let mut stats = Self::default();
        for word in words {
            stats.lines[word.channel().as_index()].observe(word.direction(), word.timestamp());
        }
        stats
    }

    #[must_use]
    pub fn line(&self, channel: CaptureChannel) -> &LineStats {
        &self.lines[channel.as_index()]
    }

    /// Edges across every channel.
    #[must_use]
    pub fn edges(&self) -> usize {
        self.lines.iter().map(LineStats::edges).sum()
    }
}
