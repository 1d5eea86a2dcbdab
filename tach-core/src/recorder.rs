//! Interrupt-side entry point for captured edges.

use crate::edge::{CaptureChannel, Edge, EdgeDirection, EdgeWord};
use crate::mailbox::Mailbox;
use crate::trace::TraceBuffer;

/// Producer handle invoked by the capture interrupt on every edge.
///
/// Encodes the edge, appends it to the trace when a session is active and
/// notifies the rotation consumer. None of these steps block or fail
/// visibly; a full or disabled trace simply drops the event.
#[derive(Copy, Clone)]
pub struct EdgeRecorder<'c, 'a> {
    trace: &'c TraceBuffer<'a>,
    edges: &'c Mailbox<EdgeWord>,
}

impl<'c, 'a> EdgeRecorder<'c, 'a> {
    /// Records into `trace` and forwards each edge to `edges`.
    #[must_use]
    pub const fn new(trace: &'c TraceBuffer<'a>, edges: &'c Mailbox<EdgeWord>) -> Self {
        Self { trace, edges }
    }

    /// Handles one captured transition. Returns the encoded word.
    pub fn on_edge(
        &self,
        channel: CaptureChannel,
        direction: EdgeDirection,
        raw_timestamp: u32,
    ) -> EdgeWord {
        let word = Edge::new(channel, direction, raw_timestamp).encode();
        self.trace.record(word);
        self.edges.send(word);
        word
    }
}
