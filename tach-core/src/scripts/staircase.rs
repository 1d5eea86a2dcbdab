//! Staircase script: climb to full duty in eighths, then descend.

use core::time::Duration;

use super::{DutyLevel, LEAD_IN_HOLD, ScriptKind, ScriptStep, ScriptTemplate, TRAILING_HOLD};

/// Time spent on each stair.
pub const STAIR_HOLD: Duration = Duration::from_millis(1_600);

/// Number of duty increments between zero and full.
pub const STAIR_DIVISIONS: usize = 8;

/// Nine ascending stairs (0 through 8 eighths) and eight descending ones.
pub const STAIRCASE_STEP_COUNT: usize = 2 * STAIR_DIVISIONS + 1;

const fn stair(eighths: u8) -> ScriptStep {
    ScriptStep::hold(DutyLevel::eighths(eighths), STAIR_HOLD)
}

const fn staircase_steps() -> [ScriptStep; STAIRCASE_STEP_COUNT] {
    let mut steps = [stair(0); STAIRCASE_STEP_COUNT];
    let mut index = 0;
    let mut eighths: u8 = 0;
    while index < STAIRCASE_STEP_COUNT {
        steps[index] = stair(eighths);
        if index < STAIRCASE_STEP_COUNT / 2 {
            eighths += 1;
        } else {
            eighths = eighths.saturating_sub(1);
        }
        index += 1;
    }
    steps
}

pub const STAIRCASE_STEPS: [ScriptStep; STAIRCASE_STEP_COUNT] = staircase_steps();

pub const STAIRCASE_TEMPLATE: ScriptTemplate = ScriptTemplate::new(
    ScriptKind::Staircase,
    Some(ScriptStep::hold(DutyLevel::OFF, LEAD_IN_HOLD)),
    &STAIRCASE_STEPS,
    Some(ScriptStep::hold(DutyLevel::OFF, TRAILING_HOLD)),
    true,
);

#[must_use]
pub const fn staircase_template() -> ScriptTemplate {
    STAIRCASE_TEMPLATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staircase_climbs_then_descends_in_eighths() {
        let template = staircase_template();
        assert_eq!(template.kind, ScriptKind::Staircase);
        assert_eq!(template.step_count(), 17);

        let expected = [
            0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.875, 1.0, 0.875, 0.75, 0.625, 0.5, 0.375,
            0.25, 0.125, 0.0,
        ];

        for (step, level) in template.steps.iter().zip(expected) {
            match step {
                ScriptStep::HoldAt { level: actual, duration } => {
                    assert_eq!(actual.ratio(), level);
                    assert_eq!(*duration, Duration::from_millis(1_600));
                }
                other => panic!("unexpected staircase step {other:?}"),
            }
        }

        assert_eq!(template.steps[8].level(), DutyLevel::FULL);
        assert_eq!(template.steps[9].level().ratio(), 0.875);
        assert_eq!(template.steps[16].level(), DutyLevel::OFF);
    }
}
