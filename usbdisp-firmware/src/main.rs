//! usbdisp - USB Display Firmware
//!
//! Turns an RP2040 board with an ILI9341 panel into a USB display. The host
//! streams draw commands on a vendor-specific bulk OUT endpoint; drawing
//! status comes back on an interrupt IN endpoint.
//!
//! ```text
//! USB ─▶ bulk_rx_task ─▶ BULK_RX ─▶ engine_task ─▶ ILI9341 (SPI0)
//!  ▲                                     │
//!  └──── status_tx_task ◀─ STATUS_TX ◀───┘
//! ```
//!
//! Panel wiring: SCK GP18, MOSI GP19, MISO GP16, CS GP17, DC GP20.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::USB;
use embassy_rp::spi::{self, Spi};
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_time::Delay;
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::ConstStaticCell;
use {defmt_rtt as _, panic_probe as _};

use usbdisp_core::{Engine, UsbRing};
use usbdisp_display::Ili9341;
use usbdisp_protocol::STATUS_PACKET_LEN;

use crate::transport::UsbTransport;

mod channels;
mod config;
mod tasks;
mod transport;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

/// pid.codes test VID/PID
const USB_VID: u16 = 0x1209;
const USB_PID: u16 = 0x0001;

/// Vendor-specific interface class and subclass
const CLASS_VENDOR: u8 = 0xFF;

/// Interrupt IN polling interval
const STATUS_POLL_MS: u8 = 5;

/// Interrupt IN max packet size; each status report uses only the first bytes
const STATUS_MAX_PACKET: u16 = 32;
const _: () = assert!(STATUS_PACKET_LEN <= STATUS_MAX_PACKET as usize);

// Descriptor and control buffers for the USB stack (must live forever)
static CONFIG_DESCRIPTOR: ConstStaticCell<[u8; 128]> = ConstStaticCell::new([0; 128]);
static BOS_DESCRIPTOR: ConstStaticCell<[u8; 16]> = ConstStaticCell::new([0; 16]);
static CONTROL_BUF: ConstStaticCell<[u8; 64]> = ConstStaticCell::new([0; 64]);

/// Bulk OUT backlog, borrowed by the engine for its whole life
static RING: ConstStaticCell<UsbRing> = ConstStaticCell::new(UsbRing::new());

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("usbdisp firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load();

    // Panel on SPI0
    let mut spi_config = spi::Config::default();
    spi_config.frequency = config.display.spi_frequency_hz;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let cs = Output::new(p.PIN_17, Level::High);
    let dc = Output::new(p.PIN_20, Level::Low);

    let panel_config = config.engine.panel;
    let mut panel = Ili9341::new(
        spi,
        dc,
        cs,
        Delay,
        panel_config.width,
        panel_config.height,
        config::rotation(panel_config.orientation),
    );
    match panel.init() {
        Ok(()) => info!("ILI9341 initialized"),
        Err(e) => error!("ILI9341 init failed: {:?}", e),
    }

    // USB device with one vendor interface: bulk OUT commands, interrupt IN status
    let driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some("usbdisp");
    usb_config.product = Some("USB Display");
    usb_config.serial_number = Some("00000001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.take(),
        BOS_DESCRIPTOR.take(),
        &mut [],
        CONTROL_BUF.take(),
    );

    let (bulk_out, status_in) = {
        let mut function = builder.function(CLASS_VENDOR, CLASS_VENDOR, 0);
        let mut interface = function.interface();
        let mut alt = interface.alt_setting(CLASS_VENDOR, CLASS_VENDOR, 0, None);
        let bulk_out = alt.endpoint_bulk_out(None, config.engine.packet_size);
        let status_in = alt.endpoint_interrupt_in(None, STATUS_MAX_PACKET, STATUS_POLL_MS);
        (bulk_out, status_in)
    };
    let device = builder.build();
    info!("USB device configured ({:x}:{:x})", USB_VID, USB_PID);

    let engine = match Engine::new(UsbTransport::new(), panel, RING.take(), config.engine) {
        Ok(engine) => engine,
        Err(e) => {
            // load() only returns validated configs
            error!("Engine config rejected: {:?}", e);
            return;
        }
    };

    spawner.spawn(unwrap!(tasks::usb_device_task(device)));
    spawner.spawn(unwrap!(tasks::bulk_rx_task(bulk_out)));
    spawner.spawn(unwrap!(tasks::status_tx_task(status_in)));
    spawner.spawn(unwrap!(tasks::engine_task(engine)));

    info!("All tasks spawned, firmware running");
}
