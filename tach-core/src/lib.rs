#![no_std]

//! Tach capture and drive scripting logic shared by firmware and host targets.
//!
//! - [`edge`]: packed edge words.
//! - [`trace`]: bounded recording of edges for offline inspection.
//! - [`mailbox`]: latest-value-wins handoff between contexts.
//! - [`recorder`]: interrupt-side producer.
//! - [`rotation`]: wraparound-safe periods and speed.
//! - [`measurement`]: shared duty/speed readings.
//! - [`scripts`] and [`actuation`]: drive scripts and their executor.
//! - [`command`]: console grammar.

pub mod actuation;
pub mod command;
pub mod context;
pub mod edge;
pub mod mailbox;
pub mod measurement;
pub mod recorder;
pub mod rotation;
pub mod scripts;
pub mod trace;
