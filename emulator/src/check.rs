//! Offline summary of a saved dump, for `--check <file>`.

use tach_core::edge::{CaptureChannel, EdgeDirection, EdgeWord};
use tach_core::trace::{DirectionStats, DumpParseError, ParsedDump, TraceStats, parse_dump};

const CHANNELS: [(CaptureChannel, &str); CaptureChannel::COUNT] = [
    (CaptureChannel::Reference, "reference"),
    (CaptureChannel::Drive, "drive"),
];

const DIRECTIONS: [(EdgeDirection, &str); EdgeDirection::COUNT] = [
    (EdgeDirection::Rising, "rising"),
    (EdgeDirection::Falling, "falling"),
];

/// Parses the dump in `text` and describes each line's timing.
///
/// Periods are converted to frequencies with `capture_clock_hz`.
///
/// # Errors
///
/// Fails when `text` holds no complete dump.
pub fn check_dump(text: &str, capture_clock_hz: u32) -> Result<Vec<String>, DumpParseError> {
    let ParsedDump { title, words } = parse_dump::<Vec<EdgeWord>>(text)?;
    let stats = TraceStats::from_words(words.iter().copied());

    let mut lines = vec![format!("{title}: {} events", stats.edges())];
    for (channel, channel_name) in CHANNELS {
        let line = stats.line(channel);
        for (direction, direction_name) in DIRECTIONS {
            lines.push(format!(
                "{channel_name} {direction_name}: {}",
                describe_periods(line.direction(direction), capture_clock_hz)
            ));
        }

        let duty = line
            .duty()
            .map_or_else(|| "n/a".to_string(), |duty| format!("{:.1}%", duty * 100.0));
        lines.push(format!(
            "{channel_name} duty {duty}, {} out of order, {} repeated",
            line.out_of_order, line.repeated_direction
        ));
    }
    Ok(lines)
}

fn describe_periods(stats: &DirectionStats, capture_clock_hz: u32) -> String {
    let Some(mean) = stats.mean_period() else {
        return format!("{} edges", stats.edges);
    };
    let hz = f64::from(capture_clock_hz) / mean;
    format!(
        "{} edges, period {}/{mean:.1}/{} ticks (min/mean/max), {hz:.2} Hz",
        stats.edges, stats.min_period, stats.max_period
    )
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use portable_atomic::AtomicU32;
    use tach_core::context::CaptureContext;
    use tach_core::scripts::ScriptKind;
    use tach_core::trace::TraceBuffer;

    use super::*;
    use crate::bench::{Bench, BenchConfig};

    #[test]
    fn half_speed_session_reads_back_as_half_duty() {
        let config = BenchConfig::default().with_pwm_frequency(1_000);
        let clock = config.capture_clock_hz;
        let slots: Vec<AtomicU32> = (0..50_000).map(|_| AtomicU32::new(0)).collect();
        let context = CaptureContext::new(TraceBuffer::new(&slots), config.rotation());
        let bench = Bench::new(&context, config);

        context.request_script(ScriptKind::HalfSpeed);
        block_on(bench.executor().serve_next(&context.commands)).unwrap();
        let mut text = String::from("run half-speed\n");
        context.trace.dump("Half speed scenario", &mut text).unwrap();
        text.push_str("done half-speed\n");

        let lines = check_dump(&text, clock).unwrap();
        let recorded = context.trace.recorded().count();
        assert_eq!(lines[0], format!("Half speed scenario: {recorded} events"));
        assert!(lines[4].starts_with("drive rising: "), "{lines:?}");
        assert!(lines[4].ends_with("1000.00 Hz"), "{lines:?}");
        assert!(lines[6].starts_with("drive duty 50.0%, 0 out of order"), "{lines:?}");
    }

    #[test]
    fn empty_lines_have_no_periods() {
        let lines = check_dump("Idle\n0 events logged\n", 1_000_000).unwrap();
        assert_eq!(
            lines,
            [
                "Idle: 0 events",
                "reference rising: 0 edges",
                "reference falling: 0 edges",
                "reference duty n/a, 0 out of order, 0 repeated",
                "drive rising: 0 edges",
                "drive falling: 0 edges",
                "drive duty n/a, 0 out of order, 0 repeated",
            ]
        );
    }

    #[test]
    fn text_without_a_dump_is_rejected() {
        assert_eq!(
            check_dump("Tach bench emulator ready.\n", 1_000_000),
            Err(DumpParseError::MissingCount)
        );
    }
}
