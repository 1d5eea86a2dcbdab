//! Virtual-time bench.
//!
//! The bench advances in 1 ms steps. Each step spins the fan model, lays
//! out the PWM loopback edges, sorts them by time and feeds them through the
//! context's [`EdgeRecorder`](tach_core::recorder::EdgeRecorder) exactly as
//! the capture interrupt would. Every captured edge is then taken from the
//! edge mailbox and fed to [`CaptureContext::observe_edge`], standing in for
//! the rotation task. A reporter sample is taken every `report_interval`.
//!
//! Scripts run on the real [`ScriptExecutor`]: [`BenchDrive`] changes the
//! simulated duty and [`BenchTimer`] advances the clock, so awaiting either
//! completes immediately in wall time.

use std::cell::RefCell;
use std::convert::Infallible;
use std::time::Duration;

use tach_core::actuation::{DriveOutput, ScriptExecutor, StepTimer};
use tach_core::context::CaptureContext;
use tach_core::edge::{CaptureChannel, EdgeDirection};
use tach_core::measurement::{Measurement, SharedMeasurement};
use tach_core::rotation::{RotationConfig, SpeedUpdate};
use tach_core::scripts::DutyLevel;

mod fan;
mod loopback;

pub use fan::{Fan, FanModel};
pub use loopback::PwmLoopback;

/// Simulation step. Fades also update once per step.
pub const STEP: Duration = Duration::from_millis(1);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BenchConfig {
    pub capture_clock_hz: u32,
    pub pwm_frequency_hz: u32,
    pub fan: FanModel,
    pub report_interval: Duration,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            capture_clock_hz: 1_000_000,
            pwm_frequency_hz: 25_000,
            fan: FanModel::default(),
            report_interval: Duration::from_millis(100),
        }
    }
}

impl BenchConfig {
    /// Same bench with a slower PWM carrier, which keeps long scenarios
    /// cheap to simulate.
    #[must_use]
    pub fn with_pwm_frequency(mut self, hz: u32) -> Self {
        self.pwm_frequency_hz = hz;
        self
    }

    /// Rotation settings matching this bench's capture clock.
    #[must_use]
    pub const fn rotation(&self) -> RotationConfig {
        RotationConfig::new(self.capture_clock_hz)
    }
}

/// One simulated input transition, in bench microseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimEdge {
    pub at_us: u64,
    pub channel: CaptureChannel,
    pub direction: EdgeDirection,
}

/// Reporter sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Report {
    pub at: Duration,
    pub measurement: Measurement,
}

/// Drive level change seen by the bench.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DriveChange {
    pub at: Duration,
    pub level: DutyLevel,
    pub fade: Option<Duration>,
}

struct BenchState {
    now_us: u64,
    duty: f32,
    fan: Fan,
    loopback: PwmLoopback,
    next_report_us: u64,
    reports: Vec<Report>,
    drive_log: Vec<DriveChange>,
    edges_emitted: usize,
    rejected: usize,
    scratch: Vec<SimEdge>,
}

pub struct Bench<'c, 'a> {
    context: &'c CaptureContext<'a>,
    config: BenchConfig,
    state: RefCell<BenchState>,
}

impl<'c, 'a> Bench<'c, 'a> {
    #[must_use]
    pub fn new(context: &'c CaptureContext<'a>, config: BenchConfig) -> Self {
        Self {
            context,
            config,
            state: RefCell::new(BenchState {
                now_us: 0,
                duty: 0.0,
                fan: Fan::new(config.fan),
                loopback: PwmLoopback::new(config.pwm_frequency_hz),
                next_report_us: micros(config.report_interval).max(1),
                reports: Vec::new(),
                drive_log: Vec::new(),
                edges_emitted: 0,
                rejected: 0,
                scratch: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn context(&self) -> &'c CaptureContext<'a> {
        self.context
    }

    #[must_use]
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Virtual time since the bench was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        Duration::from_micros(self.state.borrow().now_us)
    }

    /// Duty currently applied to the simulated motor.
    #[must_use]
    pub fn duty(&self) -> f32 {
        self.state.borrow().duty
    }

    #[must_use]
    pub fn fan_rpm(&self) -> f64 {
        self.state.borrow().fan.rpm()
    }

    /// Edges fed to the recorder so far, recorded or not.
    #[must_use]
    pub fn edges_emitted(&self) -> usize {
        self.state.borrow().edges_emitted
    }

    /// Intervals the rotation timer refused to publish.
    #[must_use]
    pub fn rejected_intervals(&self) -> usize {
        self.state.borrow().rejected
    }

    #[must_use]
    pub fn take_reports(&self) -> Vec<Report> {
        std::mem::take(&mut self.state.borrow_mut().reports)
    }

    #[must_use]
    pub fn take_drive_log(&self) -> Vec<DriveChange> {
        std::mem::take(&mut self.state.borrow_mut().drive_log)
    }

    /// Runs the simulation forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let step_us = micros(STEP);
        let mut remaining = micros(duration);
        while remaining > 0 {
            let dt = remaining.min(step_us);
            self.step(dt);
            remaining -= dt;
        }
    }

    #[must_use]
    pub fn executor(&self) -> ScriptExecutor<'c, 'a, BenchDrive<'_, 'c, 'a>, BenchTimer<'_, 'c, 'a>> {
        ScriptExecutor::new(
            BenchDrive { bench: self },
            BenchTimer { bench: self },
            &self.context.trace,
            &self.context.measurement,
        )
    }

    fn set_duty(&self, duty: f32) {
        self.state.borrow_mut().duty = duty;
    }

    fn log_drive(&self, level: DutyLevel, fade: Option<Duration>) {
        let mut state = self.state.borrow_mut();
        let at = Duration::from_micros(state.now_us);
        state.drive_log.push(DriveChange { at, level, fade });
    }

    fn step(&self, dt_us: u64) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let start = state.now_us;

        state.scratch.clear();
        state.fan.step(state.duty, start, dt_us, &mut state.scratch);
        state.loopback.step(state.duty, start, dt_us, &mut state.scratch);
        state.scratch.sort_by_key(|edge| edge.at_us);

        let recorder = self.context.recorder();
        for edge in &state.scratch {
            recorder.on_edge(edge.channel, edge.direction, self.ticks_at(edge.at_us));
            if let Some(word) = self.context.edges.try_receive() {
                let sample = self.context.observe_edge(word);
                if let SpeedUpdate::Rejected { .. } = sample.speed {
                    state.rejected += 1;
                }
            }
        }
        state.edges_emitted += state.scratch.len();
        state.now_us = start + dt_us;

        let interval = micros(self.config.report_interval).max(1);
        while state.next_report_us <= state.now_us {
            state.reports.push(Report {
                at: Duration::from_micros(state.next_report_us),
                measurement: self.context.measurement.snapshot(),
            });
            state.next_report_us += interval;
        }
    }

    /// Capture counter value at `at_us`. The counter wraps.
    fn ticks_at(&self, at_us: u64) -> u32 {
        let ticks = u128::from(at_us) * u128::from(self.config.capture_clock_hz) / 1_000_000;
        u32::try_from(ticks & u128::from(u32::MAX)).unwrap_or(u32::MAX)
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Bench microsecond counts stay far below 2^52, so the conversion is exact.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_f64(micros: u64) -> f64 {
    micros as f64
}

/// Rounds a non-negative bench time to the nearest microsecond.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn round_micros(at: f64) -> u64 {
    at.round().max(0.0) as u64
}

/// `step / steps` as a fade progress ratio.
#[allow(clippy::cast_precision_loss)]
fn progress(step: u64, steps: u64) -> f32 {
    step as f32 / steps as f32
}

pub struct BenchDrive<'b, 'c, 'a> {
    bench: &'b Bench<'c, 'a>,
}

impl DriveOutput for BenchDrive<'_, '_, '_> {
    type Error = Infallible;

    fn set_level(&mut self, level: DutyLevel) -> Result<(), Self::Error> {
        self.bench.log_drive(level, None);
        self.bench.set_duty(level.ratio());
        Ok(())
    }

    async fn fade_to(
        &mut self,
        level: DutyLevel,
        duration: Duration,
        duty: &SharedMeasurement,
    ) -> Result<(), Self::Error> {
        self.bench.log_drive(level, Some(duration));
        let start = self.bench.duty();
        let span = level.ratio() - start;
        let steps = (micros(duration) / micros(STEP)).max(1);

        for step in 1..=steps {
            self.bench.advance(STEP.min(duration));
            let applied = start + span * progress(step, steps);
            self.bench.set_duty(applied);
            duty.set_duty(applied);
        }
        self.bench.set_duty(level.ratio());
        duty.set_duty(level.ratio());
        Ok(())
    }
}

pub struct BenchTimer<'b, 'c, 'a> {
    bench: &'b Bench<'c, 'a>,
}

impl StepTimer for BenchTimer<'_, '_, '_> {
    async fn wait(&mut self, duration: Duration) {
        self.bench.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use portable_atomic::AtomicU32;
    use tach_core::trace::TraceBuffer;

    use super::*;

    fn storage(events: usize) -> Vec<AtomicU32> {
        (0..events).map(|_| AtomicU32::new(0)).collect()
    }

    fn context(slots: &[AtomicU32]) -> CaptureContext<'_> {
        CaptureContext::new(TraceBuffer::new(slots), BenchConfig::default().rotation())
    }

    #[test]
    fn reporter_samples_every_interval() {
        let slots = storage(8);
        let context = context(&slots);
        let bench = Bench::new(&context, BenchConfig::default());

        bench.advance(Duration::from_millis(1_000));

        let reports = bench.take_reports();
        assert_eq!(reports.len(), 10);
        assert_eq!(reports[0].at, Duration::from_millis(100));
        assert_eq!(reports[9].at, Duration::from_millis(1_000));
        assert!(bench.take_reports().is_empty());
    }

    #[test]
    fn spinning_fan_publishes_its_speed() {
        let slots = storage(8);
        let context = context(&slots);
        let bench = Bench::new(&context, BenchConfig::default().with_pwm_frequency(1_000));

        bench.set_duty(1.0);
        bench.advance(Duration::from_secs(4));

        // 3000 rpm on a 10000 rpm scale.
        let speed = context.measurement.snapshot().speed;
        assert!((speed - 0.3).abs() < 0.01, "speed {speed}");
        assert!(bench.edges_emitted() > 0);
        assert_eq!(bench.rejected_intervals(), 0);
    }

    #[test]
    fn fades_step_the_duty_and_take_their_duration() {
        let slots = storage(8);
        let context = context(&slots);
        let bench = Bench::new(&context, BenchConfig::default().with_pwm_frequency(1_000));
        let mut drive = BenchDrive { bench: &bench };

        embassy_futures::block_on(drive.fade_to(
            DutyLevel::FULL,
            Duration::from_millis(200),
            &context.measurement,
        ))
        .unwrap();

        assert_eq!(bench.now(), Duration::from_millis(200));
        assert!((bench.duty() - 1.0).abs() < f32::EPSILON);
        assert!((context.measurement.snapshot().duty - 1.0).abs() < f32::EPSILON);
        assert_eq!(
            bench.take_drive_log(),
            [DriveChange {
                at: Duration::ZERO,
                level: DutyLevel::FULL,
                fade: Some(Duration::from_millis(200)),
            }]
        );
    }

    #[test]
    fn capture_counter_wraps() {
        let slots = storage(8);
        let context = context(&slots);
        let config = BenchConfig {
            capture_clock_hz: 64_000_000,
            ..BenchConfig::default()
        };
        let bench = Bench::new(&context, config);

        assert_eq!(bench.ticks_at(1), 64);
        assert_eq!(bench.ticks_at(67_108_864), 0);
    }
}
