use embassy_futures::join::join;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::class::cdc_acm::Sender;
use embassy_usb::driver::{Driver, EndpointError};
use tach_core::context::CaptureContext;

use super::USB_STORAGE;
use crate::console::{LineAssembler, Response, handle_line, handle_line_error};
use crate::usb::{self, ConsolePort, UsbConsole, UsbDeviceStrings};

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

#[embassy_executor::task]
pub async fn run(
    context: &'static CaptureContext<'static>,
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let UsbConsole { mut device, port } =
        UsbConsole::new(driver, storage, UsbDeviceStrings::default());

    join(device.run(), serve_console(context, port)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

async fn serve_console<D>(context: &'static CaptureContext<'static>, mut port: ConsolePort<D>) -> !
where
    D: Driver<'static>,
{
    let mut ingress = [0u8; usb::MAX_PACKET_SIZE as usize];
    let mut assembler = LineAssembler::new();
    let mut response = Response::new();

    loop {
        port.wait_ready().await;
        assembler.reset();
        defmt::info!("console: host connected");

        'session: loop {
            let count = match port.receiver.read_packet(&mut ingress).await {
                Ok(count) => count,
                Err(EndpointError::Disabled) => {
                    defmt::warn!("console: interface disabled");
                    break 'session;
                }
                Err(EndpointError::BufferOverflow) => {
                    defmt::warn!("console: read overflow");
                    continue;
                }
            };

            for byte in &ingress[..count] {
                response.clear();
                let written = match assembler.push(*byte) {
                    None => continue,
                    Some(Ok(line)) => handle_line(line, context, &mut response),
                    Some(Err(err)) => handle_line_error(err, &mut response),
                };
                if written.is_err() {
                    defmt::warn!("console: response truncated");
                }

                if let Err(EndpointError::Disabled) =
                    write_response(&mut port.sender, response.as_bytes()).await
                {
                    defmt::warn!("console: write disabled");
                    break 'session;
                }
            }

            if !port.sender.dtr() {
                defmt::warn!("console: host dropped DTR");
                break 'session;
            }
        }
    }
}

/// Writes `bytes` in max-size packets, ending with a short packet so the
/// host flushes its buffer.
async fn write_response<D>(sender: &mut Sender<'static, D>, bytes: &[u8]) -> Result<(), EndpointError>
where
    D: Driver<'static>,
{
    let packet = usize::from(usb::MAX_PACKET_SIZE);
    for chunk in bytes.chunks(packet) {
        sender.write_packet(chunk).await?;
    }
    if !bytes.is_empty() && bytes.len() % packet == 0 {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}
