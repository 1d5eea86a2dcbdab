//! Unrecoverable setup failures.
//!
//! Anything that goes wrong while acquiring or configuring the capture
//! timer or the drive output ends up in [`halt`], which repeats a one-line
//! diagnostic roughly once a second and never returns.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt;
use core::panic::Location;

/// Setup failures the firmware knows how to describe.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SetupFault {
    /// The capture timer clock cannot be divided down to the tick rate.
    CaptureClock { timer_hz: u32, tick_hz: u32 },
    /// The drive timer produced a zero-length PWM period.
    DrivePeriod,
}

impl SetupFault {
    /// Numeric code printed alongside the description.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            SetupFault::CaptureClock { .. } => 0x101,
            SetupFault::DrivePeriod => 0x201,
        }
    }
}

impl fmt::Display for SetupFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupFault::CaptureClock { timer_hz, tick_hz } => {
                write!(f, "timer clock {timer_hz} Hz cannot produce {tick_hz} Hz ticks")
            }
            SetupFault::DrivePeriod => f.write_str("drive PWM period is zero"),
        }
    }
}

/// A fault together with where it was raised.
#[derive(Copy, Clone, Debug)]
pub struct FaultReport {
    pub subsystem: &'static str,
    pub fault: SetupFault,
    pub location: &'static Location<'static>,
}

impl FaultReport {
    /// Captures the caller's location.
    #[track_caller]
    pub fn new(subsystem: &'static str, fault: SetupFault) -> Self {
        Self {
            subsystem,
            fault,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for FaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: error {} ({:#x}) at {}:{}: {}",
            self.subsystem,
            self.fault.code(),
            self.fault.code(),
            self.location.file(),
            self.location.line(),
            self.fault
        )
    }
}

/// Reports `report` forever.
pub fn halt(report: FaultReport) -> ! {
    loop {
        log_fault(&report);
        pause();
    }
}

#[cfg(target_os = "none")]
fn log_fault(report: &FaultReport) {
    defmt::error!("{}", defmt::Display2Format(report));
}

#[cfg(not(target_os = "none"))]
fn log_fault(report: &FaultReport) {
    println!("{report}");
}

#[cfg(target_os = "none")]
fn pause() {
    // HSI16 core clock, about one second.
    cortex_m::asm::delay(16_000_000);
}

#[cfg(not(target_os = "none"))]
fn pause() {
    std::thread::sleep(std::time::Duration::from_secs(1));
}

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::error!("fault: panic: {}", defmt::Display2Format(info));
    cortex_m::asm::udf();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_names_subsystem_code_and_location() {
        let report = FaultReport::new("drive", SetupFault::DrivePeriod);
        let text = format!("{report}");

        assert!(text.starts_with("drive: error 513 (0x201) at "), "{text}");
        assert!(text.contains("fault.rs:"), "{text}");
        assert!(text.ends_with("drive PWM period is zero"), "{text}");
    }

    #[test]
    fn capture_clock_fault_explains_the_mismatch() {
        let fault = SetupFault::CaptureClock {
            timer_hz: 1_500_000,
            tick_hz: 1_000_000,
        };
        assert_eq!(
            format!("{fault}"),
            "timer clock 1500000 Hz cannot produce 1000000 Hz ticks"
        );
        assert_eq!(fault.code(), 0x101);
    }
}
