//! USB transport abstractions
//!
//! The protocol engine sees the USB function as two endpoints: a bulk OUT
//! endpoint carrying the command stream, and an interrupt IN endpoint carrying
//! status packets back to the host.

/// Endpoint selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// Host → device command stream
    BulkOut,
    /// Device → host status reports
    InterruptIn,
}

impl Endpoint {
    /// Returns true if data flows from the host to the device
    pub fn is_out(&self) -> bool {
        matches!(self, Endpoint::BulkOut)
    }
}

/// Non-blocking endpoint access
///
/// Every call returns immediately with whatever the hardware currently has.
/// Callers must never assume a call satisfies the full requested length.
pub trait Transport {
    /// Error type for transport operations
    type Error;

    /// Number of bytes that can be received right now
    ///
    /// For an IN endpoint this is always 0.
    fn available(&mut self, endpoint: Endpoint) -> usize;

    /// Receive up to `buf.len()` bytes
    ///
    /// Returns the number of bytes copied, which may be 0. A single call never
    /// returns more than one transport packet.
    fn recv(&mut self, endpoint: Endpoint, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Queue `data` for transmission
    ///
    /// Returns the number of bytes accepted. An endpoint that is busy returns
    /// an error rather than waiting.
    fn send(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<usize, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn available(&mut self, endpoint: Endpoint) -> usize {
        (**self).available(endpoint)
    }

    fn recv(&mut self, endpoint: Endpoint, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).recv(endpoint, buf)
    }

    fn send(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<usize, Self::Error> {
        (**self).send(endpoint, data)
    }
}
