//! Reporter and trace dump output.
//!
//! Lines are formatted into a fixed `heapless::String` and then emitted as a
//! single `{=str}` so the host sees exactly the text the emulator prints.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::Write;

use tach_core::measurement::Measurement;
use tach_core::trace::TraceBuffer;

/// Longest line the reporter or the dump produces. A dump line holds
/// eight hex words and seven separators.
pub const LINE_CAPACITY: usize = 96;

pub type Line = heapless::String<LINE_CAPACITY>;

/// Formats the reporter line for `measurement`. Output that does not fit is
/// truncated at the capacity.
pub fn report_line(measurement: Measurement) -> Line {
    let mut line = Line::new();
    let _ = write!(line, "{}", measurement.report());
    line
}

/// Emits the full dump of `trace`, yielding to the executor every
/// `lines_per_yield` lines so the reporter and console keep running.
pub async fn dump(trace: &TraceBuffer<'_>, title: &str, lines_per_yield: usize) {
    let mut line = Line::new();
    for (index, entry) in trace.dump_lines(title).enumerate() {
        line.clear();
        let _ = write!(line, "{entry}");
        emit_line(&line);
        if lines_per_yield != 0 && (index + 1) % lines_per_yield == 0 {
            embassy_futures::yield_now().await;
        }
    }
}

#[cfg(target_os = "none")]
pub fn emit_line(line: &str) {
    defmt::println!("{=str}", line);
}

#[cfg(not(target_os = "none"))]
pub fn emit_line(line: &str) {
    println!("{line}");
}
