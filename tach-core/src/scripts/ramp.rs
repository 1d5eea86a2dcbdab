//! Ramp script: fade up to full duty and back down using the drive's
//! hardware fade engine.

use core::time::Duration;

use super::{DutyLevel, LEAD_IN_HOLD, ScriptKind, ScriptStep, ScriptTemplate, TRAILING_HOLD};

/// Length of each fade.
pub const FADE_TIME: Duration = Duration::from_millis(5_000);

pub const RAMP_STEPS: [ScriptStep; 2] = [
    ScriptStep::fade(DutyLevel::FULL, FADE_TIME),
    ScriptStep::fade(DutyLevel::OFF, FADE_TIME),
];

pub const RAMP_TEMPLATE: ScriptTemplate = ScriptTemplate::new(
    ScriptKind::Ramp,
    Some(ScriptStep::hold(DutyLevel::OFF, LEAD_IN_HOLD)),
    &RAMP_STEPS,
    Some(ScriptStep::hold(DutyLevel::OFF, TRAILING_HOLD)),
    true,
);

#[must_use]
pub const fn ramp_template() -> ScriptTemplate {
    RAMP_TEMPLATE
}
