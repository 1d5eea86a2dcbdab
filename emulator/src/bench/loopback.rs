use tach_core::edge::{CaptureChannel, EdgeDirection};

use super::{SimEdge, as_f64, round_micros};

/// The drive PWM as seen on the loopback capture input. Periods start at
/// multiples of the carrier period; a constant 0 or 1 duty has no edges.
#[derive(Copy, Clone, Debug)]
pub struct PwmLoopback {
    period_us: f64,
}

impl PwmLoopback {
    #[must_use]
    pub fn new(frequency_hz: u32) -> Self {
        Self {
            period_us: 1_000_000.0 / f64::from(frequency_hz.max(1)),
        }
    }

    /// Appends the edges falling in `[start_us, start_us + dt_us)`.
    pub fn step(&self, duty: f32, start_us: u64, dt_us: u64, edges: &mut Vec<SimEdge>) {
        if duty <= 0.0 || duty >= 1.0 {
            return;
        }

        let start = as_f64(start_us);
        let end = start + as_f64(dt_us);
        let high = f64::from(duty) * self.period_us;
        let mut period = ((start - self.period_us) / self.period_us).floor().max(0.0);

        loop {
            let rise = period * self.period_us;
            if rise >= end {
                break;
            }
            for (at, direction) in [(rise, EdgeDirection::Rising), (rise + high, EdgeDirection::Falling)] {
                if at >= start && at < end {
                    edges.push(SimEdge {
                        at_us: round_micros(at),
                        channel: CaptureChannel::Drive,
                        direction,
                    });
                }
            }
            period += 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_duty_at_25_khz() {
        let loopback = PwmLoopback::new(25_000);
        let mut edges = Vec::new();
        loopback.step(0.25, 0, 1_000, &mut edges);

        assert_eq!(edges.len(), 50);
        assert_eq!(edges[0].at_us, 0);
        assert_eq!(edges[0].direction, EdgeDirection::Rising);
        assert_eq!(edges[1].at_us, 10);
        assert_eq!(edges[1].direction, EdgeDirection::Falling);
        assert_eq!(edges[2].at_us, 40);
    }

    #[test]
    fn falling_edge_carried_into_next_window() {
        let loopback = PwmLoopback::new(1_000);
        let mut first = Vec::new();
        let mut second = Vec::new();
        loopback.step(0.9, 0, 500, &mut first);
        loopback.step(0.9, 500, 500, &mut second);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].at_us, 900);
        assert_eq!(second[0].direction, EdgeDirection::Falling);
    }

    #[test]
    fn constant_levels_have_no_edges() {
        let loopback = PwmLoopback::new(25_000);
        let mut edges = Vec::new();
        loopback.step(0.0, 0, 1_000, &mut edges);
        loopback.step(1.0, 0, 1_000, &mut edges);
        assert!(edges.is_empty());
    }
}
