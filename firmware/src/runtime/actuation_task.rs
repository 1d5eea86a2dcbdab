use tach_core::actuation::{ScriptError, ScriptExecutor};
use tach_core::context::CaptureContext;

use crate::actuation::{EmbassyStepTimer, log_script_finished, log_script_started};
use crate::config::DUMP_LINES_PER_YIELD;
use crate::drive::PwmDrive;
use crate::telemetry;

/// Runs one script per command and dumps the trace afterwards.
#[embassy_executor::task]
pub async fn run(context: &'static CaptureContext<'static>, drive: PwmDrive) -> ! {
    let mut executor = ScriptExecutor::new(
        drive,
        EmbassyStepTimer,
        &context.trace,
        &context.measurement,
    );
    match executor.idle() {
        Ok(()) => {}
        Err(ScriptError::Drive(never)) => match never {},
    }

    loop {
        let kind = context.commands.receive().await;
        log_script_started(kind);

        match executor.run(kind).await {
            Ok(report) => {
                log_script_finished(&report);
                if let Some(title) = report.dump_title() {
                    telemetry::dump(&context.trace, title, DUMP_LINES_PER_YIELD).await;
                }
            }
            Err(ScriptError::Drive(never)) => match never {},
        }
    }
}
