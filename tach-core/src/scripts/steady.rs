//! Constant-level scripts: run the motor at one level and record it there.
//!
//! There are no steps of interest. The lead-in reaches the level and the
//! trailing hold keeps it while the session records.

use super::{DutyLevel, LEAD_IN_HOLD, ScriptKind, ScriptStep, ScriptTemplate, TRAILING_HOLD};

pub const FULL_SPEED_TEMPLATE: ScriptTemplate = ScriptTemplate::new(
    ScriptKind::FullSpeed,
    Some(ScriptStep::hold(DutyLevel::FULL, LEAD_IN_HOLD)),
    &[],
    Some(ScriptStep::hold(DutyLevel::FULL, TRAILING_HOLD)),
    true,
);

pub const HALF_SPEED_TEMPLATE: ScriptTemplate = ScriptTemplate::new(
    ScriptKind::HalfSpeed,
    Some(ScriptStep::hold(DutyLevel::HALF, LEAD_IN_HOLD)),
    &[],
    Some(ScriptStep::hold(DutyLevel::HALF, TRAILING_HOLD)),
    true,
);

#[must_use]
pub const fn full_speed_template() -> ScriptTemplate {
    FULL_SPEED_TEMPLATE
}

#[must_use]
pub const fn half_speed_template() -> ScriptTemplate {
    HALF_SPEED_TEMPLATE
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use super::*;

    #[test]
    fn steady_scripts_settle_then_record_the_trailing_hold() {
        for (template, level) in [
            (full_speed_template(), DutyLevel::FULL),
            (half_speed_template(), DutyLevel::HALF),
        ] {
            assert!(template.records);
            assert_eq!(template.lead_in, Some(ScriptStep::hold(level, LEAD_IN_HOLD)));
            assert_eq!(template.step_count(), 0);
            assert_eq!(template.trailing, Some(ScriptStep::hold(level, TRAILING_HOLD)));
            assert_eq!(template.total_duration(), Duration::from_secs(6));
        }
    }
}
