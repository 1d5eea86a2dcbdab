//! Compile-time configuration for the bench controller.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_time::Duration;
use tach_core::edge::CaptureChannel;
use tach_core::rotation::RotationConfig;
use tach_core::scripts::ScriptKind;
use tach_core::trace::TraceCapacity;

/// Line recorded by the firmware trace. Drive loopback edges arrive at
/// twice the PWM carrier rate and are not kept on the MCU.
pub const TRACE_CHANNEL: CaptureChannel = CaptureChannel::Reference;

/// Trace sizing for [`TRACE_CHANNEL`] alone: 500 tachometer edges per second
/// for 32 s, which covers the 30.2 s a staircase session records. Takes
/// 64 kB of RAM.
pub const TRACE_CAPACITY: TraceCapacity = TraceCapacity::new(500, 32);
pub const TRACE_EVENTS: usize = TRACE_CAPACITY.events();

/// Capture counter rate after prescaling.
pub const CAPTURE_TICK_HZ: u32 = 1_000_000;

pub const ROTATION: RotationConfig = RotationConfig::new(CAPTURE_TICK_HZ);

/// Drive PWM carrier frequency.
pub const PWM_FREQUENCY_HZ: u32 = 25_000;

/// Interval between compare updates while fading.
pub const FADE_TICK: Duration = Duration::from_millis(1);

/// Reporter period.
pub const REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// The rotation task logs a warning after this long without edges.
pub const EDGE_STALE_AFTER: Duration = Duration::from_millis(1_000);

/// Script queued right after boot, if any.
pub const BOOT_SCRIPT: Option<ScriptKind> = None;

/// Dump lines written between yields to the executor.
pub const DUMP_LINES_PER_YIELD: usize = 2;

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use tach_core::scripts::{LEAD_IN_HOLD, staircase_template};

    use super::*;

    #[test]
    fn trace_outlasts_the_longest_recorded_session() {
        let recorded = staircase_template().total_duration() - LEAD_IN_HOLD;
        assert!(Duration::from_secs(32) >= recorded, "{recorded:?}");
        assert_eq!(TRACE_EVENTS, 16_000);
        assert_eq!(TRACE_EVENTS * size_of::<u32>(), 64_000);
    }
}
