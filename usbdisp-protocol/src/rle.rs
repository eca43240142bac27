//! Run-length pixel codec
//!
//! An RLE payload is a sequence of blocks. Each block starts with one header
//! byte:
//! ```text
//!   7        6..3       2..0
//! ┌────────┬──────────┬──────┐
//! │ COMMON │ reserved │ SEL  │   block length = (SEL + 1) * 2 bytes
//! └────────┴──────────┴──────┘
//! ```
//! A literal block is followed by its `(SEL + 1) * 2` content bytes, passed
//! straight to the pixel stream. A common block is followed by a single
//! little-endian color which is repeated `SEL + 1` times.

use crate::command::FrameError;

/// Common (repeated color) block flag
pub const RLE_COMMON_FLAG: u8 = 0x80;

/// Size selector bits of a block header
pub const RLE_SIZE_MASK: u8 = 0x07;

/// Most pixels one block can describe
pub const RLE_MAX_BLOCK_PIXELS: usize = (RLE_SIZE_MASK as usize) + 1;

/// Block length in bytes for a header byte
pub fn block_len(header: u8) -> u8 {
    ((header & RLE_SIZE_MASK) + 1) * 2
}

/// Outcome of feeding one byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RleStep {
    /// Byte was a block header
    Header,
    /// Byte was buffered (low half of a common color)
    Pending,
    /// Literal content byte for the raw pixel stream
    Literal(u8),
    /// Repeat `color` `count` times
    Run { color: u16, count: u16 },
}

/// Byte-at-a-time RLE block decoder
///
/// State persists between calls so a block may straddle transport packets.
#[derive(Debug, Clone, Default)]
pub struct RleDecoder {
    block_remaining: u8,
    block_position: u8,
    common: bool,
    low: u8,
}

impl RleDecoder {
    /// Create a decoder positioned before the first block header
    pub const fn new() -> Self {
        Self {
            block_remaining: 0,
            block_position: 0,
            common: false,
            low: 0,
        }
    }

    /// Forget any partial block
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns true if the next byte is a block header
    pub fn at_block_boundary(&self) -> bool {
        self.block_position == self.block_remaining
    }

    /// Feed one byte
    pub fn step(&mut self, byte: u8) -> RleStep {
        if self.at_block_boundary() {
            self.block_remaining = block_len(byte);
            self.common = byte & RLE_COMMON_FLAG != 0;
            // A common block only carries one color
            self.block_position = if self.common {
                self.block_remaining - 2
            } else {
                0
            };
            return RleStep::Header;
        }

        self.block_position += 1;

        if !self.common {
            return RleStep::Literal(byte);
        }

        if self.block_position < self.block_remaining {
            self.low = byte;
            RleStep::Pending
        } else {
            RleStep::Run {
                color: u16::from_le_bytes([self.low, byte]),
                count: (self.block_remaining / 2) as u16,
            }
        }
    }
}

/// Worst-case encoded size for `pixels` input pixels
pub const fn max_encoded_len(pixels: usize) -> usize {
    pixels * 2 + pixels.div_ceil(RLE_MAX_BLOCK_PIXELS) + 1
}

/// Encode pixels into RLE blocks
///
/// Runs of two or more identical pixels become common blocks; everything else
/// is packed into literal blocks. Returns the number of bytes written.
pub fn encode(pixels: &[u16], out: &mut [u8]) -> Result<usize, FrameError> {
    let mut written = 0;
    let mut i = 0;

    while i < pixels.len() {
        let run = run_length(&pixels[i..]);

        if run >= 2 {
            let block = [
                RLE_COMMON_FLAG | (run - 1) as u8,
                pixels[i] as u8,
                (pixels[i] >> 8) as u8,
            ];
            put(out, &mut written, &block)?;
            i += run;
            continue;
        }

        let mut end = i + 1;
        while end < pixels.len() && end - i < RLE_MAX_BLOCK_PIXELS && run_length(&pixels[end..]) < 2
        {
            end += 1;
        }

        put(out, &mut written, &[(end - i - 1) as u8])?;
        for pixel in &pixels[i..end] {
            put(out, &mut written, &pixel.to_le_bytes())?;
        }
        i = end;
    }

    Ok(written)
}

fn run_length(pixels: &[u16]) -> usize {
    let first = pixels[0];
    pixels
        .iter()
        .take(RLE_MAX_BLOCK_PIXELS)
        .take_while(|&&p| p == first)
        .count()
}

fn put(out: &mut [u8], written: &mut usize, bytes: &[u8]) -> Result<(), FrameError> {
    let end = *written + bytes.len();
    out.get_mut(*written..end)
        .ok_or(FrameError::BufferTooSmall)?
        .copy_from_slice(bytes);
    *written = end;
    Ok(())
}
