//! Latest duty and speed readings shared between tasks.
//!
//! Both values are ratios in `[0, 1]`. Writers and readers hold the lock
//! only for the copy, so a reader always sees a pair that some writer
//! stored as a unit.

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Snapshot of the shared readings.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Measurement {
    pub duty: f32,
    pub speed: f32,
}

impl Measurement {
    #[must_use]
    pub const fn new(duty: f32, speed: f32) -> Self {
        Self { duty, speed }
    }

    /// Plotter-friendly rendering of this snapshot.
    #[must_use]
    pub const fn report(self) -> ReportLine {
        ReportLine(self)
    }
}

/// `Duty:<float>,Speed:<float>`, the line emitted by the periodic reporter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReportLine(pub Measurement);

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duty:{},Speed:{}", self.0.duty, self.0.speed)
    }
}

/// Latest [`Measurement`], written by the rotation and actuation tasks and
/// read whole by the reporter.
pub struct SharedMeasurement {
    inner: Mutex<CriticalSectionRawMutex, Cell<Measurement>>,
}

impl SharedMeasurement {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Measurement::new(0.0, 0.0))),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Measurement {
        self.inner.lock(Cell::get)
    }

    /// Replaces both readings at once.
    pub fn publish(&self, measurement: Measurement) {
        self.inner.lock(|cell| cell.set(measurement));
    }

    pub fn set_duty(&self, duty: f32) {
        self.update(|measurement| measurement.duty = duty);
    }

    pub fn set_speed(&self, speed: f32) {
        self.update(|measurement| measurement.speed = speed);
    }

    fn update(&self, apply: impl FnOnce(&mut Measurement)) {
        self.inner.lock(|cell| {
            let mut current = cell.get();
            apply(&mut current);
            cell.set(current);
        });
    }
}

impl Default for SharedMeasurement {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::format;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn duty_and_speed_update_independently() {
        let shared = SharedMeasurement::new();
        shared.set_duty(0.5);
        shared.set_speed(0.25);
        shared.set_duty(0.75);

        assert_eq!(shared.snapshot(), Measurement::new(0.75, 0.25));
    }

    #[test]
    fn report_line_matches_plotter_format() {
        let line = Measurement::new(0.5, 0.125).report();
        assert_eq!(format!("{line}"), "Duty:0.5,Speed:0.125");
    }

    #[test]
    fn concurrent_readers_never_observe_torn_pairs() {
        static SHARED: SharedMeasurement = SharedMeasurement::new();
        static DONE: AtomicBool = AtomicBool::new(false);

        let writer = thread::spawn(|| {
            for step in 0..20_000_u32 {
                let value = f32::from(u16::try_from(step % 1000).unwrap()) / 1000.0;
                SHARED.publish(Measurement::new(value, value));
            }
            DONE.store(true, Ordering::Release);
        });

        let reader = thread::spawn(|| {
            let mut reads = 0_u32;
            while !DONE.load(Ordering::Acquire) || reads == 0 {
                let snapshot = SHARED.snapshot();
                assert_eq!(snapshot.duty.to_bits(), snapshot.speed.to_bits());
                assert!((0.0..=1.0).contains(&snapshot.speed));
                reads += 1;
            }
        });

        writer.join().expect("writer thread");
        reader.join().expect("reader thread");
    }
}
