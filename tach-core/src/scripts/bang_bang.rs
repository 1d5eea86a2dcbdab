//! Bang-bang script: idle, step to full duty, step back to zero.
//!
//! The motor's response to an instantaneous duty change in either direction
//! is what this script exists to capture.

use core::time::Duration;

use super::{DutyLevel, LEAD_IN_HOLD, ScriptKind, ScriptStep, ScriptTemplate};

/// Zero-duty baseline recorded before the first step.
pub const BASELINE_HOLD: Duration = Duration::from_millis(1_000);
/// Time at full duty.
pub const FULL_HOLD: Duration = Duration::from_millis(5_000);
/// Time after dropping back to zero.
pub const COAST_HOLD: Duration = Duration::from_millis(5_000);

pub const BANG_BANG_STEPS: [ScriptStep; 3] = [
    ScriptStep::hold(DutyLevel::OFF, BASELINE_HOLD),
    ScriptStep::hold(DutyLevel::FULL, FULL_HOLD),
    ScriptStep::hold(DutyLevel::OFF, COAST_HOLD),
];

pub const BANG_BANG_TEMPLATE: ScriptTemplate = ScriptTemplate::new(
    ScriptKind::BangBang,
    Some(ScriptStep::hold(DutyLevel::OFF, LEAD_IN_HOLD)),
    &BANG_BANG_STEPS,
    None,
    true,
);

#[must_use]
pub const fn bang_bang_template() -> ScriptTemplate {
    BANG_BANG_TEMPLATE
}
