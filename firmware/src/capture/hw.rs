use embassy_stm32::gpio::Pull;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::pac;
use embassy_stm32::peripherals::{PA0, PB10, TIM2};
use embassy_stm32::timer::input_capture::CapturePin;
use embassy_stm32::timer::low_level::{InputCaptureMode, InputTISelection, Timer};
use embassy_stm32::timer::{Ch1, Ch3, Channel};
use embassy_stm32::Peri;
use static_cell::StaticCell;

use super::{CAPTURE_UNITS, prescaler_for};
use crate::config::CAPTURE_TICK_HZ;
use crate::fault::SetupFault;
use crate::runtime::CONTEXT;

/// Keeps the timer clocked and the pins in their alternate function for
/// the lifetime of the firmware.
struct CaptureHardware {
    _timer: Timer<'static, TIM2>,
    _tach: CapturePin<'static, TIM2, Ch1>,
    _loopback: CapturePin<'static, TIM2, Ch3>,
}

static CAPTURE: StaticCell<CaptureHardware> = StaticCell::new();

const UNITS: [(Channel, InputTISelection, InputCaptureMode); 4] = [
    (Channel::Ch1, InputTISelection::Normal, InputCaptureMode::Rising),
    (Channel::Ch2, InputTISelection::Alternate, InputCaptureMode::Falling),
    (Channel::Ch3, InputTISelection::Normal, InputCaptureMode::Rising),
    (Channel::Ch4, InputTISelection::Alternate, InputCaptureMode::Falling),
];

/// Configures TIM2 for dual-edge capture on both lines and unmasks its
/// interrupt. Returns the capture tick rate.
///
/// # Errors
///
/// Fails when the timer clock cannot be divided down to the capture rate.
pub fn start(
    tim: Peri<'static, TIM2>,
    tach: Peri<'static, PA0>,
    loopback: Peri<'static, PB10>,
) -> Result<u32, SetupFault> {
    let tach = CapturePin::new(tach, Pull::Up);
    let loopback = CapturePin::new(loopback, Pull::None);
    let timer = Timer::new(tim);

    let prescaler = prescaler_for(timer.get_clock_frequency().0, CAPTURE_TICK_HZ)?;
    let regs = timer.regs_gp32();
    regs.psc().write_value(prescaler);
    regs.arr().write_value(u32::MAX);
    regs.egr().write(|w| w.set_ug(true));

    for (channel, selection, mode) in UNITS {
        timer.set_input_ti_selection(channel, selection);
        timer.set_input_capture_mode(channel, mode);
        timer.enable_channel(channel, true);
        timer.enable_input_interrupt(channel, true);
    }
    timer.start();

    CAPTURE.init(CaptureHardware {
        _timer: timer,
        _tach: tach,
        _loopback: loopback,
    });

    interrupt::TIM2.set_priority(Priority::P0);
    unsafe { interrupt::TIM2.enable() };

    log_capture_started(CAPTURE_TICK_HZ);
    Ok(CAPTURE_TICK_HZ)
}

#[interrupt]
fn TIM2() {
    let regs = pac::TIM2;
    let pending = regs.sr().read();
    let recorder = CONTEXT.recorder();

    for (unit, (channel, direction)) in CAPTURE_UNITS.iter().enumerate() {
        if pending.ccif(unit) {
            // Reading CCRx clears CCxIF.
            let stamp = regs.ccr(unit).read();
            recorder.on_edge(*channel, *direction, stamp);
        }
    }
}

fn log_capture_started(tick_hz: u32) {
    defmt::info!("capture: TIM2 running at {=u32} Hz on PA0/PB10", tick_hz);
}
