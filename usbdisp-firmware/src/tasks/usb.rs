//! USB endpoint tasks
//!
//! `bulk_rx_task` copies bulk OUT packets into [`BULK_RX`]. It waits while the
//! channel is full, which leaves the endpoint unread and NAKs the host.
//! `status_tx_task` writes queued status reports to the interrupt IN endpoint.

use defmt::*;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, Endpoint, In, Out};
use embassy_usb::driver::{EndpointError, EndpointIn, EndpointOut};
use embassy_usb::UsbDevice;

use usbdisp_protocol::MAX_PACKET_SIZE;

use crate::channels::{Packet, BULK_RX, PACKET_READY, STATUS_TX};

pub type UsbDriver = Driver<'static, USB>;

/// Runs the USB device state machine (enumeration, control requests)
#[embassy_executor::task]
pub async fn usb_device_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await
}

/// Bulk OUT reader
#[embassy_executor::task]
pub async fn bulk_rx_task(mut endpoint: Endpoint<'static, USB, Out>) {
    let mut buf = [0u8; MAX_PACKET_SIZE];

    loop {
        endpoint.wait_enabled().await;
        info!("Bulk OUT endpoint enabled");

        loop {
            match endpoint.read(&mut buf).await {
                Ok(0) => {}
                Ok(n) => {
                    trace!("OUT: {} bytes", n);
                    // n never exceeds the buffer, which is the packet capacity
                    if let Ok(packet) = Packet::from_slice(&buf[..n]) {
                        BULK_RX.send(packet).await;
                        PACKET_READY.signal(());
                    }
                }
                Err(EndpointError::Disabled) => {
                    info!("Bulk OUT endpoint disabled");
                    break;
                }
                Err(e) => {
                    warn!("Bulk OUT read error: {:?}", e);
                }
            }
        }
    }
}

/// Interrupt IN writer
#[embassy_executor::task]
pub async fn status_tx_task(mut endpoint: Endpoint<'static, USB, In>) {
    loop {
        endpoint.wait_enabled().await;
        info!("Status endpoint enabled");

        loop {
            let report = STATUS_TX.receive().await;
            match endpoint.write(&report).await {
                Ok(()) => trace!("IN: status {:x}", report),
                Err(EndpointError::Disabled) => {
                    info!("Status endpoint disabled");
                    break;
                }
                Err(e) => {
                    warn!("Status write error: {:?}", e);
                }
            }
        }
    }
}
