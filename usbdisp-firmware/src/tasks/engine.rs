//! Protocol engine task
//!
//! Polls the engine, yielding after every step so the USB tasks keep
//! servicing the endpoints between packets and pixel batches.

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Blocking, Spi};
use embassy_time::Delay;

use usbdisp_core::{Activity, Engine};
use usbdisp_display::Ili9341;

use crate::channels::PACKET_READY;
use crate::transport::UsbTransport;

/// ILI9341 on SPI0
pub type Panel = Ili9341<Spi<'static, SPI0, Blocking>, Output<'static>, Output<'static>, Delay>;

pub type UsbEngine = Engine<'static, UsbTransport, Panel>;

/// Completed commands between stats reports
const STATS_INTERVAL: u32 = 1024;

#[embassy_executor::task]
pub async fn engine_task(mut engine: UsbEngine) {
    info!("Engine task started");

    if let Err(e) = engine.start() {
        warn!("Initial status not queued: {:?}", e);
    }

    let mut completed: u32 = 0;

    loop {
        match engine.poll() {
            Ok(Activity::Completed(done)) => {
                trace!("{:?} done (status sent: {})", done.opcode, done.status_sent);

                completed = completed.wrapping_add(1);
                if completed % STATS_INTERVAL == 0 {
                    debug!("Engine stats: {:?}", engine.stats());
                }
            }
            Ok(Activity::Pending) => {}
            Ok(Activity::Idle) => {
                PACKET_READY.wait().await;
                continue;
            }
            Err(e) => {
                warn!("Engine: {:?}", e);
            }
        }

        yield_now().await;
    }
}
