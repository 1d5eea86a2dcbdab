//! Process-lifetime state shared by the capture interrupt and every task.
//!
//! One [`CaptureContext`] is created at startup, usually as a `static`, and
//! handed out by reference. The interrupt only ever sees it through an
//! [`EdgeRecorder`]. Rotation state is advanced only by the edge consumer
//! through [`CaptureContext::observe_edge`].

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::edge::{CaptureChannel, EdgeDirection, EdgeWord};
use crate::mailbox::Mailbox;
use crate::measurement::SharedMeasurement;
use crate::recorder::EdgeRecorder;
use crate::rotation::{RotationConfig, RotationSample, RotationState, RotationTimer};
use crate::scripts::ScriptKind;
use crate::trace::TraceBuffer;

/// Trace, mailboxes, readings and rotation state of one controller.
pub struct CaptureContext<'a> {
    /// Edges recorded during the current or last session.
    pub trace: TraceBuffer<'a>,
    /// Latest captured edge, consumed by the rotation task.
    pub edges: Mailbox<EdgeWord>,
    /// Latest script request, consumed by the actuation task.
    pub commands: Mailbox<ScriptKind>,
    /// Duty and speed read by the reporter.
    pub measurement: SharedMeasurement,
    rotation: Mutex<CriticalSectionRawMutex, RefCell<RotationTimer>>,
}

impl<'a> CaptureContext<'a> {
    /// Creates an idle context around `trace`. Rotation timing starts from
    /// scratch with `rotation`.
    #[must_use]
    pub const fn new(trace: TraceBuffer<'a>, rotation: RotationConfig) -> Self {
        Self {
            trace,
            edges: Mailbox::new(),
            commands: Mailbox::new(),
            measurement: SharedMeasurement::new(),
            rotation: Mutex::new(RefCell::new(RotationTimer::new(rotation))),
        }
    }

    /// Producer handle for the capture interrupt.
    #[must_use]
    pub const fn recorder(&self) -> EdgeRecorder<'_, 'a> {
        EdgeRecorder::new(&self.trace, &self.edges)
    }

    /// Queues `kind` for the actuation task, replacing any unread request.
    pub fn request_script(&self, kind: ScriptKind) {
        self.commands.send(kind);
    }

    /// Feeds one consumed edge word through the rotation timer and
    /// publishes the resulting speed, if any.
    pub fn observe_edge(&self, word: EdgeWord) -> RotationSample {
        self.rotation
            .lock(|timer| timer.borrow_mut().observe(word.decode(), &self.measurement))
    }

    #[must_use]
    pub fn rotation_state(&self, channel: CaptureChannel, direction: EdgeDirection) -> RotationState {
        self.rotation.lock(|timer| timer.borrow().state(channel, direction))
    }

    #[must_use]
    pub fn rotation_config(&self) -> RotationConfig {
        self.rotation.lock(|timer| *timer.borrow().config())
    }
}
