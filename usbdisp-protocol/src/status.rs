//! Status packet sent on the interrupt IN endpoint
//!
//! ```text
//! ┌──────┬────────────────┬───────┬──────────┐
//! │ TYPE │ DISPLAY STATUS │ TOUCH │ RESERVED │
//! │ 1B   │ 1B (bit7=DIRTY)│ 1B    │ 2B zero  │
//! └──────┴────────────────┴───────┴──────────┘
//! ```

use crate::command::FrameError;

/// Size of a status packet on the wire
pub const STATUS_PACKET_LEN: usize = 5;

/// Display status bit: panel content may not match the host's view
pub const DISPLAY_STATUS_DIRTY: u8 = 0x80;

// Wire format values
const TYPE_NORMAL: u8 = 0x00;
const TOUCH_NONE: u8 = 0x00;
const TOUCH_PRESSED: u8 = 0x01;

/// Status packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    Normal,
}

impl PacketType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            TYPE_NORMAL => Some(PacketType::Normal),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            PacketType::Normal => TYPE_NORMAL,
        }
    }
}

/// Touch state reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchStatus {
    /// No touch controller or no contact
    NoTouch,
    Pressed,
}

impl TouchStatus {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            TOUCH_NONE => Some(TouchStatus::NoTouch),
            TOUCH_PRESSED => Some(TouchStatus::Pressed),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            TouchStatus::NoTouch => TOUCH_NONE,
            TouchStatus::Pressed => TOUCH_PRESSED,
        }
    }
}

/// Device status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusPacket {
    pub packet_type: PacketType,
    /// Host must repaint before trusting panel contents
    pub dirty: bool,
    pub touch: TouchStatus,
}

impl StatusPacket {
    /// Normal status with no touch input
    pub fn new(dirty: bool) -> Self {
        Self {
            packet_type: PacketType::Normal,
            dirty,
            touch: TouchStatus::NoTouch,
        }
    }

    /// Display status byte
    pub fn display_status(&self) -> u8 {
        if self.dirty {
            DISPLAY_STATUS_DIRTY
        } else {
            0
        }
    }

    /// Encode to wire format
    pub fn encode(&self) -> [u8; STATUS_PACKET_LEN] {
        [
            self.packet_type.to_byte(),
            self.display_status(),
            self.touch.to_byte(),
            0,
            0,
        ]
    }

    /// Decode from wire format
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < STATUS_PACKET_LEN {
            return Err(FrameError::Incomplete);
        }

        let packet_type = PacketType::from_byte(bytes[0]).ok_or(FrameError::Malformed)?;
        let touch = TouchStatus::from_byte(bytes[2]).ok_or(FrameError::Malformed)?;

        Ok(Self {
            packet_type,
            dirty: bytes[1] & DISPLAY_STATUS_DIRTY != 0,
            touch,
        })
    }
}
