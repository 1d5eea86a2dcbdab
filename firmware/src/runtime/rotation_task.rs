use embassy_time::Timer;
use tach_core::context::CaptureContext;
use tach_core::rotation::SpeedUpdate;

use crate::config::EDGE_STALE_AFTER;

/// Turns captured edges into the published speed ratio.
#[embassy_executor::task]
pub async fn run(context: &'static CaptureContext<'static>) -> ! {
    loop {
        match context.edges.receive_within(Timer::after(EDGE_STALE_AFTER)).await {
            Some(word) => {
                let sample = context.observe_edge(word);
                if let SpeedUpdate::Rejected { ticks } = sample.speed {
                    defmt::warn!("rotation: ridiculous {=u32}", ticks);
                }
            }
            None => defmt::warn!("rotation: no event"),
        }
    }
}
