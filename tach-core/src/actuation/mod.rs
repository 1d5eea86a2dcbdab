//! Script executor driving the motor output.
//!
//! The executor owns the drive collaborator and a step timer, runs one
//! script at a time to completion, and brackets recording scripts with a
//! trace session. There is no cancellation: a command arriving mid-script
//! waits in the command mailbox until the executor is idle again, and only
//! the most recent one survives.
//!
//! Drive failures are returned to the caller, which treats them as fatal.
//! The executor never retries.

use core::fmt;
use core::time::Duration;

use crate::mailbox::Mailbox;
use crate::measurement::SharedMeasurement;
use crate::scripts::{DutyLevel, ScriptKind, ScriptStep, ScriptTemplate};
use crate::trace::TraceBuffer;

/// Wait between starting a recording session and the first recorded step.
pub const RECORDING_SETTLE: Duration = Duration::from_millis(1);

/// Output stage that applies duty levels to the motor.
#[allow(async_fn_in_trait)]
pub trait DriveOutput {
    type Error;

    /// Applies `level` immediately.
    ///
    /// # Errors
    ///
    /// Returns the drive's error when the level cannot be applied.
    fn set_level(&mut self, level: DutyLevel) -> Result<(), Self::Error>;

    /// Ramps to `level` over `duration`, resolving once the ramp completes.
    /// Every intermediate level is published to `duty` as it is applied.
    ///
    /// # Errors
    ///
    /// Returns the drive's error when the ramp cannot be carried out.
    async fn fade_to(
        &mut self,
        level: DutyLevel,
        duration: Duration,
        duty: &SharedMeasurement,
    ) -> Result<(), Self::Error>;
}

/// Cooperative delay used between steps.
#[allow(async_fn_in_trait)]
pub trait StepTimer {
    async fn wait(&mut self, duration: Duration);
}

/// Where the executor currently is.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ActuationState {
    /// No script running; the drive is at zero.
    Idle,
    /// Holding a level for the current step.
    HoldAt(DutyLevel),
    /// Ramping towards a level.
    FadeTo(DutyLevel),
}

/// Summary of a finished script.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptReport {
    pub kind: ScriptKind,
    /// Directives applied, lead-in and trailing steps included.
    pub steps_applied: usize,
    /// Events captured by the session, for recording scripts.
    pub recorded_events: Option<usize>,
}

impl ScriptReport {
    /// Dump heading for recording scripts.
    #[must_use]
    pub fn dump_title(&self) -> Option<&'static str> {
        self.recorded_events.map(|_| self.kind.title())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptError<E> {
    /// The drive rejected a level or fade request.
    Drive(E),
}

impl<E: fmt::Display> fmt::Display for ScriptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Drive(err) => write!(f, "drive failure: {err}"),
        }
    }
}

impl<E> From<E> for ScriptError<E> {
    fn from(error: E) -> Self {
        ScriptError::Drive(error)
    }
}

/// Runs scripts against a drive, one at a time.
pub struct ScriptExecutor<'c, 'a, D, T> {
    drive: D,
    timer: T,
    trace: &'c TraceBuffer<'a>,
    measurement: &'c SharedMeasurement,
    settle: Duration,
    state: ActuationState,
}

impl<'c, 'a, D, T> ScriptExecutor<'c, 'a, D, T>
where
    D: DriveOutput,
    T: StepTimer,
{
    #[must_use]
    pub fn new(
        drive: D,
        timer: T,
        trace: &'c TraceBuffer<'a>,
        measurement: &'c SharedMeasurement,
    ) -> Self {
        Self {
            drive,
            timer,
            trace,
            measurement,
            settle: RECORDING_SETTLE,
            state: ActuationState::Idle,
        }
    }

    /// Overrides the wait between session start and the first recorded step.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub fn state(&self) -> ActuationState {
        self.state
    }

    #[must_use]
    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }

    #[must_use]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Holds the drive at zero and marks the executor idle.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Drive`] when the drive refuses the zero level.
    pub fn idle(&mut self) -> Result<(), ScriptError<D::Error>> {
        self.drive.set_level(DutyLevel::OFF)?;
        self.measurement.set_duty(DutyLevel::OFF.ratio());
        self.state = ActuationState::Idle;
        Ok(())
    }

    /// Waits for the next command and runs it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`].
    pub async fn serve_next(
        &mut self,
        commands: &Mailbox<ScriptKind>,
    ) -> Result<ScriptReport, ScriptError<D::Error>> {
        let kind = commands.receive().await;
        self.run(kind).await
    }

    /// Runs `kind` to completion and returns the drive to zero.
    ///
    /// # Errors
    ///
    /// Returns the first drive failure. The session is closed and the drive
    /// is sent back to zero before the error is returned.
    pub async fn run(&mut self, kind: ScriptKind) -> Result<ScriptReport, ScriptError<D::Error>> {
        let outcome = self.execute(kind.template()).await;
        if self.trace.is_recording() {
            self.trace.end_recording();
        }
        self.idle()?;
        outcome
    }

    async fn execute(
        &mut self,
        template: &ScriptTemplate,
    ) -> Result<ScriptReport, ScriptError<D::Error>> {
        let mut steps_applied = 0;

        if let Some(step) = template.lead_in {
            self.apply(step).await?;
            steps_applied += 1;
        }

        if template.records {
            self.trace.begin_recording();
            self.timer.wait(self.settle).await;
        }

        for step in template.steps.iter().chain(template.trailing.iter()) {
            self.apply(*step).await?;
            steps_applied += 1;
        }

        let recorded_events = if template.records {
            self.trace.end_recording();
            Some(self.trace.len())
        } else {
            None
        };

        Ok(ScriptReport {
            kind: template.kind,
            steps_applied,
            recorded_events,
        })
    }

    async fn apply(&mut self, step: ScriptStep) -> Result<(), ScriptError<D::Error>> {
        match step {
            ScriptStep::HoldAt { level, duration } => {
                self.state = ActuationState::HoldAt(level);
                self.drive.set_level(level)?;
                self.measurement.set_duty(level.ratio());
                self.timer.wait(duration).await;
            }
            ScriptStep::FadeTo { level, duration } => {
                self.state = ActuationState::FadeTo(level);
                self.drive.fade_to(level, duration, self.measurement).await?;
                self.measurement.set_duty(level.ratio());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use embassy_futures::block_on;
    use portable_atomic::AtomicU32;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Set(f32),
        Fade(f32, Duration),
        Wait(Duration),
    }

    #[derive(Default)]
    struct LoggingDrive {
        calls: Vec<Call>,
        fades_seen: Vec<f32>,
        fail_on_fade: bool,
    }

    impl DriveOutput for LoggingDrive {
        type Error = &'static str;

        fn set_level(&mut self, level: DutyLevel) -> Result<(), Self::Error> {
            self.calls.push(Call::Set(level.ratio()));
            Ok(())
        }

        async fn fade_to(
            &mut self,
            level: DutyLevel,
            duration: Duration,
            duty: &SharedMeasurement,
        ) -> Result<(), Self::Error> {
            if self.fail_on_fade {
                return Err("fade engine offline");
            }
            self.calls.push(Call::Fade(level.ratio(), duration));
            self.fades_seen.push(duty.snapshot().duty);
            Ok(())
        }
    }

    #[derive(Default)]
    struct LoggingTimer {
        waits: Vec<Duration>,
    }

    impl StepTimer for LoggingTimer {
        async fn wait(&mut self, duration: Duration) {
            self.waits.push(duration);
        }
    }

    fn slots() -> [AtomicU32; 8] {
        core::array::from_fn(|_| AtomicU32::new(0))
    }

    #[test]
    fn idle_script_only_returns_to_zero() {
        let storage = slots();
        let trace = TraceBuffer::new(&storage);
        let shared = SharedMeasurement::new();
        let mut executor =
            ScriptExecutor::new(LoggingDrive::default(), LoggingTimer::default(), &trace, &shared);

        let report = block_on(executor.run(ScriptKind::Idle)).expect("idle succeeds");

        assert_eq!(report.steps_applied, 0);
        assert_eq!(report.recorded_events, None);
        assert_eq!(report.dump_title(), None);
        assert_eq!(executor.drive().calls, [Call::Set(0.0)]);
        assert!(executor.timer().waits.is_empty());
        assert_eq!(executor.state(), ActuationState::Idle);
    }

    #[test]
    fn ramp_fades_and_publishes_duty() {
        let storage = slots();
        let trace = TraceBuffer::new(&storage);
        let shared = SharedMeasurement::new();
        let mut executor =
            ScriptExecutor::new(LoggingDrive::default(), LoggingTimer::default(), &trace, &shared);

        let report = block_on(executor.run(ScriptKind::Ramp)).expect("ramp succeeds");

        assert_eq!(report.steps_applied, 4);
        assert_eq!(report.recorded_events, Some(0));
        assert_eq!(report.dump_title(), Some("Ramps scenario"));
        assert_eq!(
            executor.drive().calls,
            [
                Call::Set(0.0),
                Call::Fade(1.0, Duration::from_secs(5)),
                Call::Fade(0.0, Duration::from_secs(5)),
                Call::Set(0.0),
                Call::Set(0.0),
            ]
        );
        assert_eq!(
            executor.timer().waits,
            [
                Duration::from_secs(3),
                RECORDING_SETTLE,
                Duration::from_secs(3)
            ]
        );
        // Each fade starts from the level the previous step published.
        assert_eq!(executor.drive().fades_seen, [0.0, 1.0]);
        assert_eq!(shared.snapshot().duty, 0.0);
        assert!(!trace.is_recording());
    }

    #[test]
    fn drive_failure_ends_the_session_and_surfaces() {
        let storage = slots();
        let trace = TraceBuffer::new(&storage);
        let shared = SharedMeasurement::new();
        let drive = LoggingDrive {
            fail_on_fade: true,
            ..LoggingDrive::default()
        };
        let mut executor = ScriptExecutor::new(drive, LoggingTimer::default(), &trace, &shared);

        let error = block_on(executor.run(ScriptKind::Ramp)).expect_err("fade fails");

        assert_eq!(error, ScriptError::Drive("fade engine offline"));
        assert!(!trace.is_recording());
        assert_eq!(executor.state(), ActuationState::Idle);
    }

    #[test]
    fn serve_next_runs_only_the_latest_command() {
        let storage = slots();
        let trace = TraceBuffer::new(&storage);
        let shared = SharedMeasurement::new();
        let commands = Mailbox::new();
        let mut executor =
            ScriptExecutor::new(LoggingDrive::default(), LoggingTimer::default(), &trace, &shared);

        commands.send(ScriptKind::Staircase);
        commands.send(ScriptKind::HalfSpeed);

        let report = block_on(executor.serve_next(&commands)).expect("script succeeds");
        assert_eq!(report.kind, ScriptKind::HalfSpeed);
        assert!(!commands.is_pending());
    }
}
