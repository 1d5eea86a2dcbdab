use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use portable_atomic::AtomicU32;
use static_cell::StaticCell;
use tach_core::context::CaptureContext;
use tach_core::trace::TraceBuffer;

use crate::capture;
use crate::config::{BOOT_SCRIPT, ROTATION, TRACE_CHANNEL, TRACE_EVENTS};
use crate::drive::PwmDrive;
use crate::fault::{self, FaultReport};
use crate::usb;

mod actuation_task;
mod reporter_task;
mod rotation_task;
mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

static TRACE_STORAGE: [AtomicU32; TRACE_EVENTS] = [const { AtomicU32::new(0) }; TRACE_EVENTS];

/// Shared by the TIM2 interrupt and every task.
pub(crate) static CONTEXT: CaptureContext<'static> =
    CaptureContext::new(TraceBuffer::new(&TRACE_STORAGE).only_channel(TRACE_CHANNEL), ROTATION);

pub(super) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        TIM2,
        TIM3,
        PA0,
        PA6,
        PB10,
        USB,
        PA11,
        PA12,
        ..
    } = hal::init(config);

    let drive = match PwmDrive::new(TIM3, PA6) {
        Ok(drive) => drive,
        Err(fault) => fault::halt(FaultReport::new("drive", fault)),
    };

    if let Err(fault) = capture::start(TIM2, PA0, PB10) {
        fault::halt(FaultReport::new("capture", fault));
    }

    if let Some(kind) = BOOT_SCRIPT {
        CONTEXT.request_script(kind);
    }

    spawner
        .spawn(rotation_task::run(&CONTEXT))
        .expect("failed to spawn rotation task");

    spawner
        .spawn(actuation_task::run(&CONTEXT, drive))
        .expect("failed to spawn actuation task");

    spawner
        .spawn(reporter_task::run(&CONTEXT))
        .expect("failed to spawn reporter task");

    spawner
        .spawn(usb_task::run(&CONTEXT, USB, PA12, PA11))
        .expect("failed to spawn USB task");

    core::future::pending::<()>().await;
}
