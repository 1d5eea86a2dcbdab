//! Host-side bench for the tach capture pipeline.
//!
//! [`bench`] simulates the motor, its tachometer and the PWM loopback in
//! virtual time and drives the real `tach-core` recorder, rotation timer and
//! script executor with them. [`session`] puts the console grammar on top,
//! and [`check`] summarises a dump saved from either side.

pub mod bench;
pub mod check;
pub mod session;
