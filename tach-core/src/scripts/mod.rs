//! Drive scripts shared by firmware and host targets.
//!
//! A script is a compile-time template: an optional lead-in step that lets
//! the motor settle, the steps of interest, and an optional trailing step.
//! Recording scripts capture edges from the first step of interest through
//! the trailing step. The executor in [`crate::actuation`] turns a template
//! into drive calls; nothing in here touches hardware.

use core::fmt;
use core::time::Duration;

pub mod bang_bang;
pub mod ramp;
pub mod staircase;
pub mod steady;

pub use bang_bang::{BANG_BANG_TEMPLATE, bang_bang_template};
pub use ramp::{RAMP_TEMPLATE, ramp_template};
pub use staircase::{STAIRCASE_TEMPLATE, staircase_template};
pub use steady::{FULL_SPEED_TEMPLATE, HALF_SPEED_TEMPLATE, full_speed_template, half_speed_template};

/// Hold applied before recording starts so the drive transition settles.
pub const LEAD_IN_HOLD: Duration = Duration::from_millis(3_000);

/// Hold at the final level while the session keeps recording.
pub const TRAILING_HOLD: Duration = Duration::from_millis(3_000);

/// Duty ratio in `[0, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct DutyLevel(f32);

impl DutyLevel {
    pub const OFF: Self = Self(0.0);
    pub const HALF: Self = Self(0.5);
    pub const FULL: Self = Self(1.0);

    /// Validates a ratio. Values outside `[0, 1]` and NaN are refused.
    #[must_use]
    pub fn new(ratio: f32) -> Option<Self> {
        (0.0..=1.0).contains(&ratio).then_some(Self(ratio))
    }

    /// `eighths / 8`, saturating at full duty.
    #[must_use]
    pub const fn eighths(eighths: u8) -> Self {
        Self(match eighths {
            0 => 0.0,
            1 => 0.125,
            2 => 0.25,
            3 => 0.375,
            4 => 0.5,
            5 => 0.625,
            6 => 0.75,
            7 => 0.875,
            _ => 1.0,
        })
    }

    #[must_use]
    pub const fn ratio(self) -> f32 {
        self.0
    }

    /// Compare register value for a timer whose full-scale duty is
    /// `max_duty`. Never exceeds `max_duty`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn compare_value(self, max_duty: u16) -> u16 {
        // The ratio is within [0, 1], so the product is within [0, max_duty].
        (f32::from(max_duty) * self.0) as u16
    }
}

/// Named scripts the controller can run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptKind {
    Idle,
    FullSpeed,
    HalfSpeed,
    BangBang,
    Ramp,
    Staircase,
}

impl ScriptKind {
    pub const ALL: [ScriptKind; 6] = [
        ScriptKind::Idle,
        ScriptKind::FullSpeed,
        ScriptKind::HalfSpeed,
        ScriptKind::BangBang,
        ScriptKind::Ramp,
        ScriptKind::Staircase,
    ];

    /// Console name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ScriptKind::Idle => "idle",
            ScriptKind::FullSpeed => "full-speed",
            ScriptKind::HalfSpeed => "half-speed",
            ScriptKind::BangBang => "bang-bang",
            ScriptKind::Ramp => "ramp",
            ScriptKind::Staircase => "staircase",
        }
    }

    /// Heading printed above the trace dump.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            ScriptKind::Idle => "No scenario",
            ScriptKind::FullSpeed => "Full speed scenario",
            ScriptKind::HalfSpeed => "Half speed scenario",
            ScriptKind::BangBang => "Bang-bang scenario",
            ScriptKind::Ramp => "Ramps scenario",
            ScriptKind::Staircase => "Staircase scenario",
        }
    }

    /// Looks up a script by console name or alias, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        const ALIASES: [(&str, ScriptKind); 5] = [
            ("none", ScriptKind::Idle),
            ("full", ScriptKind::FullSpeed),
            ("half", ScriptKind::HalfSpeed),
            ("bangbang", ScriptKind::BangBang),
            ("ramps", ScriptKind::Ramp),
        ];

        Self::ALL
            .iter()
            .map(|kind| (kind.name(), *kind))
            .chain(ALIASES)
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, kind)| kind)
    }

    /// Template describing this script.
    #[must_use]
    pub const fn template(self) -> &'static ScriptTemplate {
        match self {
            ScriptKind::Idle => &IDLE_TEMPLATE,
            ScriptKind::FullSpeed => &FULL_SPEED_TEMPLATE,
            ScriptKind::HalfSpeed => &HALF_SPEED_TEMPLATE,
            ScriptKind::BangBang => &BANG_BANG_TEMPLATE,
            ScriptKind::Ramp => &RAMP_TEMPLATE,
            ScriptKind::Staircase => &STAIRCASE_TEMPLATE,
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One drive directive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ScriptStep {
    /// Set the level immediately, then wait.
    HoldAt { level: DutyLevel, duration: Duration },
    /// Ramp to the level over the duration using the drive's fade engine.
    FadeTo { level: DutyLevel, duration: Duration },
}

impl ScriptStep {
    /// [`ScriptStep::HoldAt`] shorthand for const tables.
    #[must_use]
    pub const fn hold(level: DutyLevel, duration: Duration) -> Self {
        ScriptStep::HoldAt { level, duration }
    }

    /// [`ScriptStep::FadeTo`] shorthand for const tables.
    #[must_use]
    pub const fn fade(level: DutyLevel, duration: Duration) -> Self {
        ScriptStep::FadeTo { level, duration }
    }

    #[must_use]
    pub const fn level(&self) -> DutyLevel {
        match *self {
            ScriptStep::HoldAt { level, .. } | ScriptStep::FadeTo { level, .. } => level,
        }
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        match *self {
            ScriptStep::HoldAt { duration, .. } | ScriptStep::FadeTo { duration, .. } => duration,
        }
    }
}

/// Compile-time description of a script.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScriptTemplate {
    pub kind: ScriptKind,
    /// Runs before recording starts.
    pub lead_in: Option<ScriptStep>,
    /// Steps of interest, executed in order.
    pub steps: &'static [ScriptStep],
    /// Runs after the steps, still inside the recording session.
    pub trailing: Option<ScriptStep>,
    /// Whether the steps are bracketed by a recording session.
    pub records: bool,
}

impl ScriptTemplate {
    #[must_use]
    pub const fn new(
        kind: ScriptKind,
        lead_in: Option<ScriptStep>,
        steps: &'static [ScriptStep],
        trailing: Option<ScriptStep>,
        records: bool,
    ) -> Self {
        Self {
            kind,
            lead_in,
            steps,
            trailing,
            records,
        }
    }

    #[must_use]
    pub const fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Sum of every step duration, lead-in and trailing hold included.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.lead_in
            .iter()
            .chain(self.steps)
            .chain(self.trailing.iter())
            .map(ScriptStep::duration)
            .sum()
    }
}

/// Does nothing; the drive stays at zero.
pub const IDLE_TEMPLATE: ScriptTemplate =
    ScriptTemplate::new(ScriptKind::Idle, None, &[], None, false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_back_to_their_script() {
        for kind in ScriptKind::ALL {
            assert_eq!(ScriptKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.template().kind, kind);
        }
    }

    #[test]
    fn aliases_and_case_are_accepted() {
        assert_eq!(ScriptKind::from_name("RAMPS"), Some(ScriptKind::Ramp));
        assert_eq!(ScriptKind::from_name("Bangbang"), Some(ScriptKind::BangBang));
        assert_eq!(ScriptKind::from_name("none"), Some(ScriptKind::Idle));
        assert_eq!(ScriptKind::from_name("warp"), None);
    }

    #[test]
    fn duty_levels_reject_out_of_range_ratios() {
        assert_eq!(DutyLevel::new(0.25).map(DutyLevel::ratio), Some(0.25));
        assert_eq!(DutyLevel::new(-0.1), None);
        assert_eq!(DutyLevel::new(1.5), None);
        assert_eq!(DutyLevel::new(f32::NAN), None);
        assert_eq!(DutyLevel::eighths(3).ratio(), 0.375);
        assert_eq!(DutyLevel::eighths(12), DutyLevel::FULL);
    }

    #[test]
    fn compare_value_scales_full_range() {
        assert_eq!(DutyLevel::OFF.compare_value(6_400), 0);
        assert_eq!(DutyLevel::HALF.compare_value(6_400), 3_200);
        assert_eq!(DutyLevel::FULL.compare_value(6_400), 6_400);
    }

    #[test]
    fn idle_does_not_record() {
        assert!(!IDLE_TEMPLATE.records);
        assert_eq!(IDLE_TEMPLATE.step_count(), 0);
        assert_eq!(IDLE_TEMPLATE.total_duration(), Duration::ZERO);
    }
}
