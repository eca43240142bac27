//! Frame decoding and encoding for draw commands
//!
//! Fixed header layouts (after the header byte, little-endian u16 fields):
//! - FILL: color
//! - RECT: left, top, right, bottom, color
//! - COPY_AREA: sx, sy, dx, dy, width, height
//! - BITBLT / BITBLT_RLE: x, y, width, height (pixel payload follows)

use crate::codec::Compression;
use crate::header::{CommandHeader, Opcode};

/// Largest fixed header (COPY_AREA)
pub const MAX_HEADER_LEN: usize = 13;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// First byte does not carry FRAME_START
    MissingStart,
    /// Opcode bits do not name a known command
    UnknownOpcode(u8),
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Bytes do not form a valid packet
    Malformed,
}

/// Whole-panel fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FillCommand {
    pub color: u16,
}

/// Rectangle fill over `[left, right) × [top, bottom)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FillRectCommand {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub color: u16,
}

impl FillRectCommand {
    /// Returns true if `left <= right` and `top <= bottom`
    pub fn is_well_formed(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }

    /// Width in pixels (0 if malformed)
    pub fn width(&self) -> u16 {
        self.right.saturating_sub(self.left)
    }

    /// Height in pixels (0 if malformed)
    pub fn height(&self) -> u16 {
        self.bottom.saturating_sub(self.top)
    }
}

/// On-panel rectangle copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CopyAreaCommand {
    pub sx: u16,
    pub sy: u16,
    pub dx: u16,
    pub dy: u16,
    pub width: u16,
    pub height: u16,
}

/// Pixel transfer into a `width × height` window at (x, y)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitBltCommand {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub compression: Compression,
}

impl BitBltCommand {
    /// Number of pixels in the destination window
    pub fn pixel_count(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Decoded payload size in bytes (`width * height * 2`)
    ///
    /// Returns `None` when the size does not fit in a `u32`.
    pub fn payload_len(&self) -> Option<u32> {
        self.pixel_count().checked_mul(2)
    }

    /// Opcode carried by this transfer and its continuation packets
    pub fn opcode(&self) -> Opcode {
        match self.compression {
            Compression::Raw => Opcode::BitBlt,
            Compression::Rle => Opcode::BitBltRle,
        }
    }
}

/// Draw command with its fixed fields decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Nop,
    Fill(FillCommand),
    FillRect(FillRectCommand),
    CopyArea(CopyAreaCommand),
    BitBlt(BitBltCommand),
}

impl Command {
    /// Opcode identifying this command on the wire
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::Nop => Opcode::Nop,
            Command::Fill(_) => Opcode::Fill,
            Command::FillRect(_) => Opcode::Rect,
            Command::CopyArea(_) => Opcode::CopyArea,
            Command::BitBlt(cmd) => cmd.opcode(),
        }
    }
}

/// A parsed or constructed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Header byte (flags and opcode)
    pub header: CommandHeader,
    /// Decoded fixed fields
    pub command: Command,
}

impl Frame {
    /// Create a frame that starts a new command
    pub fn new(command: Command) -> Self {
        Self {
            header: CommandHeader::new(command.opcode()),
            command,
        }
    }

    /// Same frame with CLEAR_DIRTY requested
    pub fn clear_dirty(mut self) -> Self {
        self.header = self.header.with_clear_dirty();
        self
    }

    /// Size of the fixed header on the wire
    pub fn header_len(&self) -> usize {
        self.command.opcode().header_len()
    }

    /// Parse a frame header from the start of `bytes`
    ///
    /// Only the fixed header is read; a BitBlt payload is left to the caller.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let first = *bytes.first().ok_or(FrameError::Incomplete)?;
        let header = CommandHeader::from_byte(first);

        if !header.is_frame_start() {
            return Err(FrameError::MissingStart);
        }

        let opcode = header
            .opcode()
            .ok_or(FrameError::UnknownOpcode(header.opcode_bits()))?;

        if bytes.len() < opcode.header_len() {
            return Err(FrameError::Incomplete);
        }

        let field = |index: usize| read_u16(bytes, 1 + index * 2);

        let command = match opcode {
            Opcode::Nop => Command::Nop,
            Opcode::Fill => Command::Fill(FillCommand { color: field(0) }),
            Opcode::Rect => Command::FillRect(FillRectCommand {
                left: field(0),
                top: field(1),
                right: field(2),
                bottom: field(3),
                color: field(4),
            }),
            Opcode::CopyArea => Command::CopyArea(CopyAreaCommand {
                sx: field(0),
                sy: field(1),
                dx: field(2),
                dy: field(3),
                width: field(4),
                height: field(5),
            }),
            Opcode::BitBlt | Opcode::BitBltRle => Command::BitBlt(BitBltCommand {
                x: field(0),
                y: field(1),
                width: field(2),
                height: field(3),
                compression: if opcode == Opcode::BitBltRle {
                    Compression::Rle
                } else {
                    Compression::Raw
                },
            }),
        };

        Ok(Self { header, command })
    }

    /// Encode the frame header into a byte buffer
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.header_len();
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }

        // The header byte always names the command actually encoded
        let flags = self.header.to_byte() & !crate::header::OPCODE_MASK;
        buffer[0] = flags | self.command.opcode().to_byte();

        let mut fields = [0u16; 6];
        let count = match self.command {
            Command::Nop => 0,
            Command::Fill(cmd) => {
                fields[0] = cmd.color;
                1
            }
            Command::FillRect(cmd) => {
                fields[..5].copy_from_slice(&[cmd.left, cmd.top, cmd.right, cmd.bottom, cmd.color]);
                5
            }
            Command::CopyArea(cmd) => {
                fields.copy_from_slice(&[cmd.sx, cmd.sy, cmd.dx, cmd.dy, cmd.width, cmd.height]);
                6
            }
            Command::BitBlt(cmd) => {
                fields[..4].copy_from_slice(&[cmd.x, cmd.y, cmd.width, cmd.height]);
                4
            }
        };

        for (i, value) in fields[..count].iter().enumerate() {
            buffer[1 + i * 2..3 + i * 2].copy_from_slice(&value.to_le_bytes());
        }

        Ok(len)
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}
