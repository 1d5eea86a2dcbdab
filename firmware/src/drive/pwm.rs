use core::convert::Infallible;
use core::time::Duration;

use embassy_stm32::Peri;
use embassy_stm32::gpio::OutputType;
use embassy_stm32::peripherals::{PA6, TIM3};
use embassy_stm32::time::hz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_time::Ticker;
use tach_core::actuation::DriveOutput;
use tach_core::measurement::SharedMeasurement;
use tach_core::scripts::DutyLevel;

use super::FadePlan;
use crate::actuation::to_embassy;
use crate::config::{FADE_TICK, PWM_FREQUENCY_HZ};
use crate::fault::SetupFault;

pub struct PwmDrive {
    pwm: SimplePwm<'static, TIM3>,
    max_duty: u16,
    level: DutyLevel,
}

impl PwmDrive {
    /// Starts the PWM carrier at zero duty.
    ///
    /// # Errors
    ///
    /// Fails when the timer reports a zero full-scale compare value.
    pub fn new(tim: Peri<'static, TIM3>, pin: Peri<'static, PA6>) -> Result<Self, SetupFault> {
        let output = PwmPin::new(pin, OutputType::PushPull);
        let mut pwm = SimplePwm::new(
            tim,
            Some(output),
            None,
            None,
            None,
            hz(PWM_FREQUENCY_HZ),
            CountingMode::EdgeAlignedUp,
        );

        let max_duty = pwm.ch1().max_duty_cycle();
        if max_duty == 0 {
            return Err(SetupFault::DrivePeriod);
        }

        let mut drive = Self {
            pwm,
            max_duty,
            level: DutyLevel::OFF,
        };
        drive.apply(DutyLevel::OFF);
        drive.pwm.ch1().enable();
        defmt::info!(
            "drive: TIM3 CH1 at {=u32} Hz, full scale {=u16}",
            PWM_FREQUENCY_HZ,
            max_duty
        );
        Ok(drive)
    }

    fn apply(&mut self, level: DutyLevel) {
        let compare = level.compare_value(self.max_duty);
        self.pwm.ch1().set_duty_cycle(compare);
    }
}

impl DriveOutput for PwmDrive {
    type Error = Infallible;

    fn set_level(&mut self, level: DutyLevel) -> Result<(), Self::Error> {
        self.apply(level);
        self.level = level;
        Ok(())
    }

    async fn fade_to(
        &mut self,
        level: DutyLevel,
        duration: Duration,
        duty: &SharedMeasurement,
    ) -> Result<(), Self::Error> {
        let tick = Duration::from_micros(FADE_TICK.as_micros());
        let plan = FadePlan::new(self.level, level, duration, tick);
        let mut ticker = Ticker::every(to_embassy(plan.interval()));

        for step in 1..=plan.steps() {
            ticker.next().await;
            let current = plan.level_at(step);
            self.apply(current);
            duty.set_duty(current.ratio());
        }

        self.level = level;
        Ok(())
    }
}
