use embassy_time::Ticker;
use tach_core::context::CaptureContext;

use crate::config::REPORT_INTERVAL;
use crate::telemetry::{emit_line, report_line};

#[embassy_executor::task]
pub async fn run(context: &'static CaptureContext<'static>) -> ! {
    let mut ticker = Ticker::every(REPORT_INTERVAL);
    loop {
        ticker.next().await;
        emit_line(&report_line(context.measurement.snapshot()));
    }
}
