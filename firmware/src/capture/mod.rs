//! TIM2 input capture feeding the edge recorder.
//!
//! TIM2 is a free-running 32-bit counter prescaled to
//! [`crate::config::CAPTURE_TICK_HZ`]. Each monitored line is wired to two
//! capture units so both edge directions are timestamped by hardware:
//!
//! | unit | input            | edge    | line                   |
//! |------|------------------|---------|------------------------|
//! | CC1  | TI1 (PA0)        | rising  | tachometer (reference) |
//! | CC2  | TI1, indirect    | falling | tachometer (reference) |
//! | CC3  | TI3 (PB10)       | rising  | drive PWM loopback     |
//! | CC4  | TI3, indirect    | falling | drive PWM loopback     |
//!
//! The interrupt handler reads each pending capture register (which also
//! clears its flag) and hands the value to the static context's recorder.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use tach_core::edge::{CaptureChannel, EdgeDirection};

use crate::fault::SetupFault;

/// Capture unit index to (channel, direction).
pub const CAPTURE_UNITS: [(CaptureChannel, EdgeDirection); 4] = [
    (CaptureChannel::Reference, EdgeDirection::Rising),
    (CaptureChannel::Reference, EdgeDirection::Falling),
    (CaptureChannel::Drive, EdgeDirection::Rising),
    (CaptureChannel::Drive, EdgeDirection::Falling),
];

/// Prescaler register value producing `tick_hz` from `timer_hz`.
///
/// # Errors
///
/// Fails unless `timer_hz` is a whole multiple of `tick_hz` within the
/// 16-bit prescaler range.
pub fn prescaler_for(timer_hz: u32, tick_hz: u32) -> Result<u16, SetupFault> {
    let fault = SetupFault::CaptureClock { timer_hz, tick_hz };
    if tick_hz == 0 || timer_hz < tick_hz || timer_hz % tick_hz != 0 {
        return Err(fault);
    }
    u16::try_from(timer_hz / tick_hz - 1).map_err(|_| fault)
}

#[cfg(target_os = "none")]
mod hw;

#[cfg(target_os = "none")]
pub use hw::start;
