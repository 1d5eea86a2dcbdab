//! Line console served over the USB CDC ACM interface.
//!
//! Bytes from the host are assembled into lines, parsed with
//! [`tach_core::command::parse`] and answered into a caller-provided writer.
//! Script requests are forwarded to the actuation task through the command
//! mailbox; the console never waits for a script to finish.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::{self, Write};
use core::str;

use heapless::Vec;
use tach_core::command::{self, Command, CommandError, HELP_LINES};
use tach_core::context::CaptureContext;
use tach_core::scripts::ScriptKind;

/// Maximum number of bytes accepted on a single line (excluding terminator).
pub const MAX_LINE_LEN: usize = 96;

/// Capacity of the per-line response buffer.
pub const RESPONSE_CAPACITY: usize = 512;

pub type Response = heapless::String<RESPONSE_CAPACITY>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LineError {
    /// The line grew past [`MAX_LINE_LEN`]; the rest of it was discarded.
    Overflow,
    InvalidUtf8,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Overflow => write!(f, "line longer than {MAX_LINE_LEN} bytes"),
            LineError::InvalidUtf8 => f.write_str("line is not valid UTF-8"),
        }
    }
}

/// Accumulates bytes until `\r` or `\n`.
#[derive(Default)]
pub struct LineAssembler {
    buffer: Vec<u8, MAX_LINE_LEN>,
    overflowed: bool,
    complete: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            overflowed: false,
            complete: false,
        }
    }

    /// Feeds one byte. Returns the finished line when `byte` terminates a
    /// non-empty one. The returned slice stays valid until the next call.
    pub fn push(&mut self, byte: u8) -> Option<Result<&str, LineError>> {
        if self.complete {
            self.buffer.clear();
            self.overflowed = false;
            self.complete = false;
        }

        match byte {
            b'\r' | b'\n' => {
                if self.buffer.is_empty() && !self.overflowed {
                    return None;
                }
                self.complete = true;
                if self.overflowed {
                    return Some(Err(LineError::Overflow));
                }
                Some(str::from_utf8(&self.buffer).map_err(|_| LineError::InvalidUtf8))
            }
            _ => {
                if self.buffer.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    /// Drops any partial line, e.g. after the host disconnects.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
        self.complete = false;
    }
}

/// Executes one console line and writes the reply, `\r\n` terminated.
///
/// # Errors
///
/// Propagates failures of `out`.
pub fn handle_line<W: Write>(line: &str, context: &CaptureContext<'_>, out: &mut W) -> fmt::Result {
    match command::parse(line) {
        Ok(Command::Run(kind)) => {
            context.request_script(kind);
            log_script_queued(kind);
            write!(out, "queued {kind}\r\n")
        }
        Ok(Command::Status) => write!(out, "{}\r\n", context.measurement.snapshot().report()),
        Ok(Command::Scripts) => {
            for kind in ScriptKind::ALL {
                write!(out, "{:<11} {}\r\n", kind.name(), kind.title())?;
            }
            Ok(())
        }
        Ok(Command::Help) => {
            for line in HELP_LINES {
                write!(out, "{line}\r\n")?;
            }
            Ok(())
        }
        Err(CommandError::Empty) => Ok(()),
        Err(err) => write!(out, "error: {err}\r\n"),
    }
}

/// Reply for a line the assembler rejected.
///
/// # Errors
///
/// Propagates failures of `out`.
pub fn handle_line_error<W: Write>(err: LineError, out: &mut W) -> fmt::Result {
    log_line_rejected(err);
    write!(out, "error: {err}\r\n")
}

#[cfg(target_os = "none")]
fn log_script_queued(kind: ScriptKind) {
    defmt::info!("console: queued {=str}", kind.name());
}

#[cfg(not(target_os = "none"))]
fn log_script_queued(kind: ScriptKind) {
    println!("console: queued {}", kind.name());
}

#[cfg(target_os = "none")]
fn log_line_rejected(err: LineError) {
    match err {
        LineError::Overflow => defmt::warn!("console: dropped overlong line"),
        LineError::InvalidUtf8 => defmt::warn!("console: dropped non-UTF-8 line"),
    }
}

#[cfg(not(target_os = "none"))]
fn log_line_rejected(err: LineError) {
    println!("console: dropped line: {err}");
}

#[cfg(test)]
mod tests {
    use portable_atomic::AtomicU32;
    use tach_core::trace::TraceBuffer;

    use super::*;
    use crate::config::ROTATION;

    static STORAGE: [AtomicU32; 8] = [const { AtomicU32::new(0) }; 8];

    fn context() -> CaptureContext<'static> {
        CaptureContext::new(TraceBuffer::new(&STORAGE), ROTATION)
    }

    fn feed<'a>(assembler: &'a mut LineAssembler, bytes: &[u8]) -> Option<Result<&'a str, LineError>> {
        let (last, head) = bytes.split_last()?;
        for byte in head {
            assert!(assembler.push(*byte).is_none());
        }
        assembler.push(*last)
    }

    #[test]
    fn assembles_lines_on_either_terminator() {
        let mut assembler = LineAssembler::new();
        assert_eq!(feed(&mut assembler, b"status\r"), Some(Ok("status")));
        assert_eq!(assembler.push(b'\n'), None);
        assert_eq!(feed(&mut assembler, b"help\n"), Some(Ok("help")));
    }

    #[test]
    fn overlong_lines_are_reported_once_and_discarded() {
        let mut assembler = LineAssembler::new();
        for _ in 0..MAX_LINE_LEN + 10 {
            assert!(assembler.push(b'x').is_none());
        }
        assert_eq!(assembler.push(b'\n'), Some(Err(LineError::Overflow)));
        assert_eq!(feed(&mut assembler, b"ramp\n"), Some(Ok("ramp")));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut assembler = LineAssembler::new();
        assert_eq!(feed(&mut assembler, &[0xff, 0xfe, b'\n']), Some(Err(LineError::InvalidUtf8)));
    }

    #[test]
    fn run_queues_the_script_for_the_actuation_task() {
        let context = context();
        let mut out = Response::new();

        handle_line("run bang-bang", &context, &mut out).unwrap();
        handle_line("staircase", &context, &mut out).unwrap();

        assert_eq!(out.as_str(), "queued bang-bang\r\nqueued staircase\r\n");
        assert_eq!(context.commands.try_receive(), Some(ScriptKind::Staircase));
        assert_eq!(context.commands.try_receive(), None);
    }

    #[test]
    fn status_prints_the_report_line() {
        let context = context();
        context.measurement.set_duty(0.5);
        context.measurement.set_speed(0.25);
        let mut out = Response::new();

        handle_line("status", &context, &mut out).unwrap();

        assert_eq!(out.as_str(), "Duty:0.5,Speed:0.25\r\n");
    }

    #[test]
    fn listings_and_errors() {
        let context = context();
        let mut out = Response::new();

        handle_line("scripts", &context, &mut out).unwrap();
        assert_eq!(out.lines().count(), ScriptKind::ALL.len());
        assert!(out.starts_with("idle"));

        out.clear();
        handle_line("reboot now", &context, &mut out).unwrap();
        assert_eq!(out.as_str(), "error: unknown command `reboot`\r\n");

        out.clear();
        handle_line("   ", &context, &mut out).unwrap();
        assert!(out.is_empty());
        assert!(!context.commands.is_pending());
    }
}
