use std::time::Duration;

use tach_core::edge::{CaptureChannel, EdgeDirection};

use super::{SimEdge, as_f64, round_micros};

/// Motor response to the drive duty.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FanModel {
    /// Speed reached at full duty.
    pub rated_rpm: f32,
    /// First-order lag between a duty change and the speed following it.
    pub time_constant: Duration,
}

impl Default for FanModel {
    fn default() -> Self {
        Self {
            rated_rpm: 3_000.0,
            time_constant: Duration::from_millis(400),
        }
    }
}

/// Spinning rotor. The tach output rises once per revolution and falls
/// half a revolution later.
#[derive(Clone, Debug)]
pub struct Fan {
    model: FanModel,
    /// Fraction of `rated_rpm`.
    speed: f64,
    /// Half-revolutions completed.
    half_turns: f64,
}

impl Fan {
    #[must_use]
    pub fn new(model: FanModel) -> Self {
        Self {
            model,
            speed: 0.0,
            half_turns: 0.0,
        }
    }

    #[must_use]
    pub fn rpm(&self) -> f64 {
        self.speed * f64::from(self.model.rated_rpm)
    }

    /// Spins for `dt_us` under `duty` and appends the tach edges produced.
    pub fn step(&mut self, duty: f32, start_us: u64, dt_us: u64, edges: &mut Vec<SimEdge>) {
        let dt = as_f64(dt_us);
        let rpm = self.rpm();
        let half_turns_per_us = rpm / 60.0 * 2.0 / 1_000_000.0;

        let from = self.half_turns;
        let to = from + half_turns_per_us * dt;
        let mut crossing = from.floor() + 1.0;
        while crossing <= to {
            let offset = (crossing - from) / half_turns_per_us;
            let direction = if crossing % 2.0 < 1.0 {
                EdgeDirection::Rising
            } else {
                EdgeDirection::Falling
            };
            edges.push(SimEdge {
                at_us: start_us + round_micros(offset),
                channel: CaptureChannel::Reference,
                direction,
            });
            crossing += 1.0;
        }
        self.half_turns = to;

        let tau = (self.model.time_constant.as_secs_f64() * 1_000_000.0).max(1.0);
        let blend = (dt / tau).min(1.0);
        self.speed += (f64::from(duty) - self.speed) * blend;
    }
}
