//! usbdisp Display Protocol
//!
//! This crate defines the wire format spoken between a USB host and the
//! display firmware. The host streams draw commands on a bulk OUT endpoint;
//! the device answers with fixed-size status packets on an interrupt IN
//! endpoint.
//!
//! # Protocol Overview
//!
//! Every frame starts with one header byte, followed by a fixed header whose
//! size depends on the opcode. All multi-byte fields are little-endian.
//! ```text
//! ┌─────────────────────────┬────────────────────────┬──────────────────┐
//! │ HEADER                  │ FIXED FIELDS           │ PIXEL PAYLOAD    │
//! │ START|CLEAR_DIRTY|OPCODE│ 0–12B (per opcode)     │ BITBLT only      │
//! └─────────────────────────┴────────────────────────┴──────────────────┘
//! ```
//!
//! BitBlt payloads (`width * height * 2` bytes of RGB565, raw or RLE) span
//! several bulk packets. Every packet after the first re-asserts the opcode in
//! its first byte so the device can detect a lost or foreign packet.
//!
//! Status packets are 5 bytes: type, display status (DIRTY bit), touch
//! status and two reserved bytes.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod codec;
pub mod color;
pub mod command;
pub mod header;
pub mod packet;
pub mod rle;
pub mod status;

pub use codec::{Compression, PayloadDecoder, PixelAssembler, PixelSink};
pub use command::{
    BitBltCommand, Command, CopyAreaCommand, FillCommand, FillRectCommand, Frame, FrameError,
    MAX_HEADER_LEN,
};
pub use header::{CommandHeader, Opcode, FLAG_CLEAR_DIRTY, FLAG_FRAME_START, OPCODE_MASK};
pub use packet::{PayloadPacketizer, MAX_PACKET_SIZE, MIN_PACKET_SIZE};
pub use rle::RleDecoder;
pub use status::{PacketType, StatusPacket, TouchStatus, STATUS_PACKET_LEN};
