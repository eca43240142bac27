//! Host-side payload packetization
//!
//! A BitBlt frame is cut into bulk packets of `packet_size` bytes:
//! ```text
//! packet 0:  [ HEADER (9B) | payload ...                      ]
//! packet 1:  [ OPCODE | payload ...                            ]
//! packet n:  [ OPCODE | payload (rest) ]
//! ```
//! Every packet after the first starts with a continuation byte. Packets are
//! filled to `packet_size` here, though the device also accepts short ones.

use heapless::Vec;

use crate::header::Opcode;

/// Largest bulk packet on a full-speed endpoint
pub const MAX_PACKET_SIZE: usize = 64;

/// Smallest packet size that fits any fixed header plus one payload byte
pub const MIN_PACKET_SIZE: usize = crate::command::MAX_HEADER_LEN + 1;

/// Splits an encoded frame header and its payload into bulk packets
#[derive(Debug, Clone)]
pub struct PayloadPacketizer<'a> {
    header: &'a [u8],
    payload: &'a [u8],
    continuation: u8,
    packet_size: usize,
    offset: usize,
    started: bool,
}

impl<'a> PayloadPacketizer<'a> {
    /// Create a packetizer
    ///
    /// `packet_size` is clamped to `MIN_PACKET_SIZE..=MAX_PACKET_SIZE`.
    pub fn new(header: &'a [u8], payload: &'a [u8], opcode: Opcode, packet_size: usize) -> Self {
        Self {
            header,
            payload,
            continuation: opcode.to_byte(),
            packet_size: packet_size.clamp(MIN_PACKET_SIZE, MAX_PACKET_SIZE),
            offset: 0,
            started: false,
        }
    }
}

impl Iterator for PayloadPacketizer<'_> {
    type Item = Vec<u8, MAX_PACKET_SIZE>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut packet = Vec::new();

        let lead: &[u8] = if self.started {
            if self.offset >= self.payload.len() {
                return None;
            }
            core::slice::from_ref(&self.continuation)
        } else {
            self.started = true;
            self.header
        };

        // Header is never longer than MIN_PACKET_SIZE
        packet.extend_from_slice(lead).ok()?;

        let take = (self.packet_size - packet.len()).min(self.payload.len() - self.offset);
        packet
            .extend_from_slice(&self.payload[self.offset..self.offset + take])
            .ok()?;
        self.offset += take;

        Some(packet)
    }
}
