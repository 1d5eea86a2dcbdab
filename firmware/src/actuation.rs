//! Glue between the script executor and embassy timing.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_time::{Duration, Timer};
use tach_core::actuation::{ScriptReport, StepTimer};

/// Converts a `core` duration to an embassy one, saturating at the largest
/// representable tick count.
#[must_use]
pub fn to_embassy(duration: core::time::Duration) -> Duration {
    u64::try_from(duration.as_micros())
        .ok()
        .and_then(Duration::try_from_micros)
        .unwrap_or(Duration::MAX)
}

/// Step timer backed by the embassy time driver.
#[derive(Default)]
pub struct EmbassyStepTimer;

impl StepTimer for EmbassyStepTimer {
    async fn wait(&mut self, duration: core::time::Duration) {
        Timer::after(to_embassy(duration)).await;
    }
}

#[cfg(target_os = "none")]
pub fn log_script_started(kind: tach_core::scripts::ScriptKind) {
    defmt::info!("actuation: running {=str}", kind.name());
}

#[cfg(not(target_os = "none"))]
pub fn log_script_started(kind: tach_core::scripts::ScriptKind) {
    println!("actuation: running {}", kind.name());
}

#[cfg(target_os = "none")]
pub fn log_script_finished(report: &ScriptReport) {
    match report.recorded_events {
        Some(events) => defmt::info!(
            "actuation: {=str} done, {=usize} steps, {=usize} events recorded",
            report.kind.name(),
            report.steps_applied,
            events
        ),
        None => defmt::info!(
            "actuation: {=str} done, {=usize} steps",
            report.kind.name(),
            report.steps_applied
        ),
    }
}

#[cfg(not(target_os = "none"))]
pub fn log_script_finished(report: &ScriptReport) {
    match report.recorded_events {
        Some(events) => println!(
            "actuation: {} done, {} steps, {} events recorded",
            report.kind.name(),
            report.steps_applied,
            events
        ),
        None => println!(
            "actuation: {} done, {} steps",
            report.kind.name(),
            report.steps_applied
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_keeps_microsecond_precision() {
        let converted = to_embassy(core::time::Duration::from_micros(1_600_250));
        assert_eq!(converted.as_micros(), 1_600_250);
    }

    #[test]
    fn conversion_saturates_huge_durations() {
        assert_eq!(to_embassy(core::time::Duration::MAX), Duration::MAX);
        let past_tick_range = core::time::Duration::from_micros(u64::MAX / 2 + 1) * 4;
        assert_eq!(to_embassy(past_tick_range), Duration::MAX);
    }
}
