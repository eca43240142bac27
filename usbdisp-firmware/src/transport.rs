//! Engine-side view of the USB endpoints
//!
//! Bulk OUT packets come out of [`BULK_RX`] one at a time and are handed to
//! the engine in whatever slices it asks for. Status reports go into
//! [`STATUS_TX`] without waiting; a full queue is reported as `Busy`.

use usbdisp_hal::{Endpoint, Transport};
use usbdisp_protocol::STATUS_PACKET_LEN;

use crate::channels::{Packet, StatusReport, BULK_RX, STATUS_TX};

/// Transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbTransportError {
    /// Status queue is full
    Busy,
    /// Receive on an IN endpoint or send on an OUT endpoint
    WrongDirection,
    /// Data is not one status report
    BadLength,
}

/// Channel-backed transport
pub struct UsbTransport {
    packet: Option<Packet>,
    offset: usize,
}

impl UsbTransport {
    pub const fn new() -> Self {
        Self {
            packet: None,
            offset: 0,
        }
    }

    /// Take the next queued packet if the current one is used up
    fn refill(&mut self) {
        if self.packet.is_none() {
            self.packet = BULK_RX.try_receive().ok();
            self.offset = 0;
        }
    }
}

impl Transport for UsbTransport {
    type Error = UsbTransportError;

    fn available(&mut self, endpoint: Endpoint) -> usize {
        if !endpoint.is_out() {
            return 0;
        }

        self.refill();
        self.packet
            .as_ref()
            .map_or(0, |packet| packet.len() - self.offset)
    }

    fn recv(&mut self, endpoint: Endpoint, buf: &mut [u8]) -> Result<usize, UsbTransportError> {
        if !endpoint.is_out() {
            return Err(UsbTransportError::WrongDirection);
        }

        self.refill();
        let Some(packet) = &self.packet else {
            return Ok(0);
        };

        let n = buf.len().min(packet.len() - self.offset);
        buf[..n].copy_from_slice(&packet[self.offset..self.offset + n]);
        self.offset += n;

        if self.offset == packet.len() {
            self.packet = None;
        }
        Ok(n)
    }

    fn send(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<usize, UsbTransportError> {
        if endpoint.is_out() {
            return Err(UsbTransportError::WrongDirection);
        }

        let report =
            StatusReport::try_from(data).map_err(|_| UsbTransportError::BadLength)?;
        STATUS_TX
            .try_send(report)
            .map_err(|_| UsbTransportError::Busy)?;
        Ok(STATUS_PACKET_LEN)
    }
}
