//! Edge words exchanged between the capture interrupt and consumer tasks.
//!
//! Every captured transition is packed into a single `u32` so it can be
//! stored in the trace buffer and handed across contexts without locking.
//! The layout, least significant bit first:
//!
//! | bits   | field     | notes                                  |
//! |--------|-----------|----------------------------------------|
//! | 0      | channel   | 0 = rotation reference, 1 = drive loop |
//! | 1      | direction | 1 = rising, 0 = falling                |
//! | 2..32  | timestamp | capture counter truncated to 30 bits   |

use core::fmt;

/// Bit offset of the channel field.
pub const CHANNEL_SHIFT: u32 = 0;
/// Mask applied to the channel field after shifting.
pub const CHANNEL_MASK: u32 = 0b1;
/// Bit offset of the direction field.
pub const DIRECTION_SHIFT: u32 = 1;
/// Mask applied to the direction field after shifting.
pub const DIRECTION_MASK: u32 = 0b1;
/// Bit offset of the timestamp field.
pub const TIMESTAMP_SHIFT: u32 = 2;
/// Width of the timestamp field. Counters wrap modulo `2^TIMESTAMP_BITS`.
pub const TIMESTAMP_BITS: u32 = 30;
/// Mask selecting the low [`TIMESTAMP_BITS`] bits of a counter value.
pub const TIMESTAMP_MASK: u32 = (1 << TIMESTAMP_BITS) - 1;

/// Capture channel an edge was observed on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CaptureChannel {
    /// Tachometer line, used to derive rotation speed.
    Reference,
    /// Loopback of the drive PWM output.
    Drive,
}

impl CaptureChannel {
    /// Number of distinct channels representable in an edge word.
    pub const COUNT: usize = 2;

    /// Deterministic index for per-channel lookup tables.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            CaptureChannel::Reference => 0,
            CaptureChannel::Drive => 1,
        }
    }

    /// Attempts to construct a [`CaptureChannel`] from a raw index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(CaptureChannel::Reference),
            1 => Some(CaptureChannel::Drive),
            _ => None,
        }
    }

    /// Value of the channel field in an edge word.
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            CaptureChannel::Reference => 0,
            CaptureChannel::Drive => 1,
        }
    }
}

/// Direction of a captured transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EdgeDirection {
    /// High to low transition.
    Falling,
    /// Low to high transition.
    Rising,
}

impl EdgeDirection {
    /// Number of distinct directions.
    pub const COUNT: usize = 2;

    /// Deterministic index for per-direction lookup tables.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            EdgeDirection::Falling => 0,
            EdgeDirection::Rising => 1,
        }
    }

    /// Value of the direction field in an edge word.
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            EdgeDirection::Falling => 0,
            EdgeDirection::Rising => 1,
        }
    }

    /// Decodes the low bit of `bit`; any other bits are ignored.
    #[must_use]
    pub const fn from_bit(bit: u32) -> Self {
        if bit & DIRECTION_MASK == 0 {
            EdgeDirection::Falling
        } else {
            EdgeDirection::Rising
        }
    }
}

/// Decoded edge. The timestamp is always within [`TIMESTAMP_MASK`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Edge {
    pub channel: CaptureChannel,
    pub direction: EdgeDirection,
    pub timestamp: u32,
}

impl Edge {
    /// Builds an edge from a raw capture counter, truncating it to the
    /// timestamp width.
    #[must_use]
    pub const fn new(channel: CaptureChannel, direction: EdgeDirection, raw_timestamp: u32) -> Self {
        Self {
            channel,
            direction,
            timestamp: raw_timestamp & TIMESTAMP_MASK,
        }
    }

    /// Packs the edge into its transfer word.
    #[must_use]
    pub const fn encode(self) -> EdgeWord {
        let channel = (self.channel.bit() & CHANNEL_MASK) << CHANNEL_SHIFT;
        let direction = (self.direction.bit() & DIRECTION_MASK) << DIRECTION_SHIFT;
        let timestamp = (self.timestamp & TIMESTAMP_MASK) << TIMESTAMP_SHIFT;
        EdgeWord(channel | direction | timestamp)
    }
}

/// Packed representation of an [`Edge`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EdgeWord(u32);

impl EdgeWord {
    /// Wraps a raw word read back from trace storage.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The packed word as stored in the trace.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Channel field.
    #[must_use]
    pub const fn channel(self) -> CaptureChannel {
        // A single bit always maps onto one of the two channels.
        match (self.0 >> CHANNEL_SHIFT) & CHANNEL_MASK {
            0 => CaptureChannel::Reference,
            _ => CaptureChannel::Drive,
        }
    }

    /// Direction field.
    #[must_use]
    pub const fn direction(self) -> EdgeDirection {
        EdgeDirection::from_bit(self.0 >> DIRECTION_SHIFT)
    }

    /// Timestamp field, already reduced to [`TIMESTAMP_BITS`] bits.
    #[must_use]
    pub const fn timestamp(self) -> u32 {
        (self.0 >> TIMESTAMP_SHIFT) & TIMESTAMP_MASK
    }

    /// Unpacks the word into an [`Edge`].
    #[must_use]
    pub const fn decode(self) -> Edge {
        Edge {
            channel: self.channel(),
            direction: self.direction(),
            timestamp: self.timestamp(),
        }
    }
}

impl From<Edge> for EdgeWord {
    fn from(edge: Edge) -> Self {
        edge.encode()
    }
}

impl fmt::LowerHex for EdgeWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Elapsed counter ticks between two timestamps, modulo `2^TIMESTAMP_BITS`.
#[must_use]
pub const fn elapsed_ticks(earlier: u32, later: u32) -> u32 {
    later.wrapping_sub(earlier) & TIMESTAMP_MASK
}
