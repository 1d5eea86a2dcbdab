//! Rotation period tracking for decoded edges.
//!
//! The timer remembers the last timestamp seen for every (channel,
//! direction) pair and measures the interval to the next edge of the same
//! kind. Intervals are taken modulo the edge timestamp width, so a counter
//! wrap between two edges still yields the true distance. Rising edges on
//! the reference channel are turned into a speed ratio and published to
//! [`SharedMeasurement`].
//!
//! Pairs that have never been seen start from timestamp zero. Their first
//! interval is meaningless but harmless.

use crate::edge::{CaptureChannel, Edge, EdgeDirection, elapsed_ticks};
use crate::measurement::SharedMeasurement;

/// Speed corresponding to a ratio of 1.0.
pub const DEFAULT_MAX_RPM: f32 = 10_000.0;

const MICROS_PER_SECOND: f32 = 1_000_000.0;
const MICROS_PER_MINUTE: f32 = 60_000_000.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RotationConfig {
    /// Frequency of the capture counter in Hz.
    pub capture_clock_hz: u32,
    /// RPM reported as speed 1.0.
    pub max_rpm: f32,
    /// Intervals at or above this many ticks do not publish a speed.
    /// `None` accepts every interval.
    pub reject_above: Option<u32>,
}

impl RotationConfig {
    #[must_use]
    pub const fn new(capture_clock_hz: u32) -> Self {
        Self {
            capture_clock_hz,
            max_rpm: DEFAULT_MAX_RPM,
            reject_above: None,
        }
    }

    #[must_use]
    pub const fn with_max_rpm(mut self, max_rpm: f32) -> Self {
        self.max_rpm = max_rpm;
        self
    }

    #[must_use]
    pub const fn with_reject_above(mut self, ticks: u32) -> Self {
        self.reject_above = Some(ticks);
        self
    }

    /// Converts counter ticks to microseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ticks_to_micros(&self, ticks: u32) -> f32 {
        ticks as f32 * MICROS_PER_SECOND / self.capture_clock_hz as f32
    }

    /// Speed ratio for one revolution lasting `ticks`, clamped to `[0, 1]`.
    /// Returns `None` for a zero-length interval.
    #[must_use]
    pub fn speed_for_period(&self, ticks: u32) -> Option<f32> {
        if ticks == 0 {
            return None;
        }
        let rpm = MICROS_PER_MINUTE / self.ticks_to_micros(ticks);
        Some((rpm / self.max_rpm).clamp(0.0, 1.0))
    }
}

/// Per (channel, direction) history.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RotationState {
    pub previous_timestamp: u32,
    pub last_duration: u32,
}

/// What [`RotationTimer::observe`] did with an edge.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SpeedUpdate {
    /// The edge does not carry speed information.
    NotReference,
    /// A new speed ratio was published.
    Published(f32),
    /// Zero-length interval; nothing published.
    ZeroPeriod,
    /// Interval exceeded the configured threshold; nothing published.
    Rejected { ticks: u32 },
}

/// Result of feeding one edge through the timer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RotationSample {
    pub edge: Edge,
    pub duration: u32,
    pub speed: SpeedUpdate,
}

/// Consumer-side rotation calculator. Lives inside the capture context and
/// is only advanced by the edge consumer.
pub struct RotationTimer {
    config: RotationConfig,
    states: [[RotationState; EdgeDirection::COUNT]; CaptureChannel::COUNT],
}

impl RotationTimer {
    #[must_use]
    pub const fn new(config: RotationConfig) -> Self {
        Self {
            config,
            states: [[RotationState {
                previous_timestamp: 0,
                last_duration: 0,
            }; EdgeDirection::COUNT]; CaptureChannel::COUNT],
        }
    }

    #[must_use]
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self, channel: CaptureChannel, direction: EdgeDirection) -> RotationState {
        self.states[channel.as_index()][direction.as_index()]
    }

    /// Records `edge` and, for reference rising edges, publishes the
    /// resulting speed into `measurement`.
    pub fn observe(&mut self, edge: Edge, measurement: &SharedMeasurement) -> RotationSample {
        let state = &mut self.states[edge.channel.as_index()][edge.direction.as_index()];
        let duration = elapsed_ticks(state.previous_timestamp, edge.timestamp);
        state.previous_timestamp = edge.timestamp;
        state.last_duration = duration;

        let speed = if edge.channel == CaptureChannel::Reference
            && edge.direction == EdgeDirection::Rising
        {
            self.speed_update(duration, measurement)
        } else {
            SpeedUpdate::NotReference
        };

        RotationSample {
            edge,
            duration,
            speed,
        }
    }

    fn speed_update(&self, duration: u32, measurement: &SharedMeasurement) -> SpeedUpdate {
        if let Some(limit) = self.config.reject_above
            && duration >= limit
        {
            return SpeedUpdate::Rejected { ticks: duration };
        }

        match self.config.speed_for_period(duration) {
            Some(speed) => {
                measurement.set_speed(speed);
                SpeedUpdate::Published(speed)
            }
            None => SpeedUpdate::ZeroPeriod,
        }
    }
}
