use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use embassy_futures::block_on;
use portable_atomic::AtomicU32;
use tach_core::actuation::{ScriptError, ScriptReport};
use tach_core::command::{self, Command, CommandError, HELP_LINES};
use tach_core::context::CaptureContext;
use tach_core::rotation::RotationConfig;
use tach_core::scripts::ScriptKind;
use tach_core::trace::{DumpLine, TraceBuffer, TraceCapacity};

use crate::bench::{Bench, BenchConfig};

/// What a session prints besides command replies.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    /// Print every dump line instead of the header and event count.
    pub full_dump: bool,
    /// Print the reporter lines sampled while a script ran.
    pub plot: bool,
    /// Mirror the conversation into this file.
    pub transcript: Option<PathBuf>,
}

pub struct Session {
    bench: Bench<'static, 'static>,
    options: SessionOptions,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    /// Creates a session over a freshly allocated trace sized by `capacity`.
    ///
    /// # Errors
    ///
    /// Fails when the transcript file cannot be created.
    pub fn new(capacity: TraceCapacity, config: BenchConfig, options: SessionOptions) -> io::Result<Self> {
        let context = leak_context(capacity, config.rotation())?;
        let transcript = options
            .transcript
            .as_deref()
            .map(TranscriptLogger::new)
            .transpose()?;

        Ok(Self {
            bench: Bench::new(context, config),
            options,
            transcript,
        })
    }

    #[must_use]
    pub fn bench(&self) -> &Bench<'static, 'static> {
        &self.bench
    }

    #[must_use]
    pub fn context(&self) -> &'static CaptureContext<'static> {
        self.bench.context()
    }

    /// Handles one console line and returns the reply lines.
    ///
    /// # Errors
    ///
    /// Fails when the transcript cannot be written.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.record(TranscriptRole::Host, &[trimmed.to_string()])?;

        let lines = match command::parse(trimmed) {
            Ok(Command::Run(kind)) => self.run_script(kind),
            Ok(Command::Status) => {
                vec![self.context().measurement.snapshot().report().to_string()]
            }
            Ok(Command::Scripts) => ScriptKind::ALL
                .iter()
                .map(|kind| format!("{:<11} {}", kind.name(), kind.title()))
                .collect(),
            Ok(Command::Help) => HELP_LINES.iter().map(|line| (*line).to_string()).collect(),
            Err(CommandError::Empty) => Vec::new(),
            Err(err) => vec![format!("error: {err}")],
        };

        self.record(TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    /// Queues `kind` through the command mailbox and runs it to completion
    /// on the bench.
    pub fn run_script(&mut self, kind: ScriptKind) -> Vec<String> {
        let context = self.context();
        let mut lines = vec![format!("queued {kind}")];

        context.request_script(kind);
        let started = self.bench.now();
        let outcome = {
            let mut executor = self.bench.executor();
            block_on(executor.serve_next(&context.commands))
        };

        let reports = self.bench.take_reports();
        if self.options.plot {
            lines.extend(
                reports
                    .into_iter()
                    .map(|report| report.measurement.report().to_string()),
            );
        }

        match outcome {
            Ok(report) => {
                lines.push(describe_report(&report, self.bench.now() - started));
                if let Some(title) = report.dump_title() {
                    self.append_dump(title, &mut lines);
                }
            }
            Err(ScriptError::Drive(never)) => match never {},
        }
        lines
    }

    fn append_dump(&self, title: &str, lines: &mut Vec<String>) {
        let trace = &self.context().trace;
        for line in trace.dump_lines(title) {
            let words = matches!(line, DumpLine::Words(_));
            if words && !self.options.full_dump {
                lines.push("(pass --dump for the event words)".to_string());
                break;
            }
            lines.push(line.to_string());
        }
    }

    fn record(&mut self, role: TranscriptRole, lines: &[String]) -> io::Result<()> {
        let Some(transcript) = self.transcript.as_mut() else {
            return Ok(());
        };
        let elapsed = self.bench.now();
        for line in lines {
            transcript.append_line(elapsed, role, line)?;
        }
        Ok(())
    }
}

fn leak_context(
    capacity: TraceCapacity,
    rotation: RotationConfig,
) -> io::Result<&'static CaptureContext<'static>> {
    let storage: &'static [AtomicU32] = Box::leak(
        (0..capacity.events())
            .map(|_| AtomicU32::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice(),
    );
    let trace = TraceBuffer::with_capacity(storage, capacity)
        .map_err(|err| io::Error::other(err.to_string()))?;
    Ok(Box::leak(Box::new(CaptureContext::new(trace, rotation))))
}

fn describe_report(report: &ScriptReport, took: Duration) -> String {
    let mut line = format!(
        "done {} in {} ({} steps",
        report.kind,
        format_duration_short(took),
        report.steps_applied
    );
    if let Some(events) = report.recorded_events {
        line.push_str(&format!(", {events} events recorded"));
    }
    line.push(')');
    line
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        writeln!(logger.writer, "# Tach bench emulator transcript")?;
        writeln!(logger.writer, "# Timestamps are bench milliseconds")?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Copy, Clone)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(options: SessionOptions) -> Session {
        Session::new(
            TraceCapacity::new(2_000, 20),
            BenchConfig::default().with_pwm_frequency(500),
            options,
        )
        .unwrap()
    }

    #[test]
    fn informational_commands() {
        let mut session = session(SessionOptions::default());

        assert_eq!(session.handle_command("status").unwrap(), ["Duty:0,Speed:0"]);
        assert_eq!(session.handle_command("scripts").unwrap().len(), ScriptKind::ALL.len());
        assert_eq!(session.handle_command("help").unwrap().len(), HELP_LINES.len());
        assert_eq!(
            session.handle_command("run warp").unwrap(),
            ["error: unknown script `warp`"]
        );
        assert!(session.handle_command("  ").unwrap().is_empty());
    }

    #[test]
    fn idle_runs_without_a_dump() {
        let mut session = session(SessionOptions::default());

        let lines = session.handle_command("idle").unwrap();

        assert_eq!(lines, ["queued idle", "done idle in 0ms (0 steps)"]);
    }

    #[test]
    fn recording_script_reports_its_dump_header() {
        let mut session = session(SessionOptions::default());

        let lines = session.handle_command("run full").unwrap();

        assert_eq!(lines[0], "queued full-speed");
        assert!(lines[1].starts_with("done full-speed in 6.001s (2 steps, "), "{}", lines[1]);
        assert_eq!(lines[2], "Full speed scenario");
        assert!(lines[3].ends_with(" events logged"));
        assert_eq!(lines[4], "(pass --dump for the event words)");
    }

    #[test]
    fn transcript_mirrors_the_conversation() {
        let path = std::env::temp_dir().join(format!("tach-transcript-{}.log", std::process::id()));
        let mut session = session(SessionOptions {
            transcript: Some(path.clone()),
            ..SessionOptions::default()
        });

        session.handle_command("status").unwrap();
        drop(session);

        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(text.contains("HOST> status"));
        assert!(text.contains("EMU < Duty:0,Speed:0"));
    }
}
