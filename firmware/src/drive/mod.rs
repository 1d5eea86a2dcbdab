//! Motor drive output.
//!
//! TIM3 CH1 (PA6) generates the drive PWM. The same signal is looped back
//! externally to the capture timer's CH3 input. Fades are carried out by
//! the drive itself: it steps the compare register once per
//! [`crate::config::FADE_TICK`] and resolves when the target is reached.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::time::Duration;

use tach_core::scripts::DutyLevel;

/// Linear ramp between two levels split into whole fade ticks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FadePlan {
    start: DutyLevel,
    target: DutyLevel,
    steps: u16,
    interval: Duration,
}

impl FadePlan {
    /// Plans a ramp lasting `duration`, with one compare update per `tick`.
    /// Always at least one step, so a zero-length fade still lands on the
    /// target. Fades too long for [`u16::MAX`] updates stretch the interval
    /// instead.
    #[must_use]
    pub fn new(start: DutyLevel, target: DutyLevel, duration: Duration, tick: Duration) -> Self {
        let tick_us = tick.as_micros().max(1);
        let steps = u16::try_from((duration.as_micros() / tick_us).max(1)).unwrap_or(u16::MAX);
        Self {
            start,
            target,
            steps,
            interval: (duration / u32::from(steps)).max(tick),
        }
    }

    #[must_use]
    pub fn steps(&self) -> u16 {
        self.steps
    }

    /// Time between compare updates.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Level after `step` updates (`1..=steps`).
    #[must_use]
    pub fn level_at(&self, step: u16) -> DutyLevel {
        if step >= self.steps {
            return self.target;
        }
        let start = self.start.ratio();
        let span = self.target.ratio() - start;
        let ratio = start + span * (f32::from(step) / f32::from(self.steps));
        DutyLevel::new(ratio).unwrap_or(self.target)
    }
}

#[cfg(target_os = "none")]
mod pwm;

#[cfg(target_os = "none")]
pub use pwm::PwmDrive;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_second_fade_updates_every_millisecond() {
        let plan = FadePlan::new(
            DutyLevel::OFF,
            DutyLevel::FULL,
            Duration::from_secs(5),
            Duration::from_millis(1),
        );
        assert_eq!(plan.steps(), 5_000);
        assert_eq!(plan.interval(), Duration::from_millis(1));
        assert_eq!(plan.level_at(2_500), DutyLevel::HALF);
        assert_eq!(plan.level_at(5_000), DutyLevel::FULL);
    }

    #[test]
    fn fading_down_moves_monotonically() {
        let plan = FadePlan::new(
            DutyLevel::FULL,
            DutyLevel::OFF,
            Duration::from_millis(80),
            Duration::from_millis(1),
        );
        let mut previous = DutyLevel::FULL;
        for step in 1..=plan.steps() {
            let level = plan.level_at(step);
            assert!(level <= previous, "step {step} rose to {level:?}");
            previous = level;
        }
        assert_eq!(previous, DutyLevel::OFF);
    }

    #[test]
    fn long_fades_stretch_the_update_interval() {
        let plan = FadePlan::new(
            DutyLevel::OFF,
            DutyLevel::FULL,
            Duration::from_secs(100),
            Duration::from_millis(1),
        );
        assert_eq!(plan.steps(), u16::MAX);
        assert!(plan.interval() > Duration::from_millis(1));
        assert!(plan.interval() * u32::from(plan.steps()) <= Duration::from_secs(100));
        assert_eq!(plan.level_at(u16::MAX), DutyLevel::FULL);
    }

    #[test]
    fn zero_length_fade_jumps_to_target() {
        let plan = FadePlan::new(
            DutyLevel::OFF,
            DutyLevel::HALF,
            Duration::ZERO,
            Duration::from_millis(1),
        );
        assert_eq!(plan.steps(), 1);
        assert_eq!(plan.interval(), Duration::from_millis(1));
        assert_eq!(plan.level_at(1), DutyLevel::HALF);
    }
}
