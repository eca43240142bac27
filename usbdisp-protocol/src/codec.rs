//! Pixel payload decoding
//!
//! [`PayloadDecoder`] turns the payload bytes of one BitBlt command into
//! RGB565 pixels, either straight (two little-endian bytes per pixel) or via
//! the [`RleDecoder`](crate::rle::RleDecoder). It stops exactly when the
//! command's pixel count has been produced, leaving any further input
//! unconsumed.

use crate::rle::{RleDecoder, RleStep};

/// Payload encoding of a BitBlt command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Compression {
    /// Two bytes per pixel
    Raw,
    /// Run-length blocks
    Rle,
}

/// Receiver of decoded pixels
pub trait PixelSink {
    /// Error type for the receiver
    type Error;

    /// Accept `count` pixels of `color`
    fn emit(&mut self, color: u16, count: u32) -> Result<(), Self::Error>;
}

/// Pairs bytes into little-endian RGB565 pixels
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelAssembler {
    low: Option<u8>,
}

impl PixelAssembler {
    pub const fn new() -> Self {
        Self { low: None }
    }

    /// Feed one byte; returns a pixel every second byte
    pub fn push(&mut self, byte: u8) -> Option<u16> {
        match self.low.take() {
            Some(low) => Some(u16::from_le_bytes([low, byte])),
            None => {
                self.low = Some(byte);
                None
            }
        }
    }

    /// Returns true if half a pixel is buffered
    pub fn is_pending(&self) -> bool {
        self.low.is_some()
    }
}

/// Streaming decoder for one BitBlt payload
#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    compression: Compression,
    remaining: u32,
    assembler: PixelAssembler,
    rle: RleDecoder,
}

impl PayloadDecoder {
    /// Create a decoder owing `total_bytes` of pixel data (`width * height * 2`)
    pub fn new(compression: Compression, total_bytes: u32) -> Self {
        Self {
            compression,
            remaining: total_bytes,
            assembler: PixelAssembler::new(),
            rle: RleDecoder::new(),
        }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Pixel bytes still owed
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns true once every owed pixel has been produced
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Decode as much of `input` as the command still needs
    ///
    /// Returns the number of input bytes consumed. Consumption stops at the
    /// byte that completes the payload, or at the end of `input`.
    pub fn decode<S: PixelSink>(&mut self, input: &[u8], sink: &mut S) -> Result<usize, S::Error> {
        let mut consumed = 0;

        for &byte in input {
            if self.is_complete() {
                break;
            }
            consumed += 1;

            match self.compression {
                Compression::Raw => self.literal(byte, sink)?,
                Compression::Rle => match self.rle.step(byte) {
                    RleStep::Header | RleStep::Pending => {}
                    RleStep::Literal(byte) => self.literal(byte, sink)?,
                    RleStep::Run { color, count } => {
                        // Truncate runs that overshoot the window
                        let count = (count as u32).min(self.remaining / 2);
                        sink.emit(color, count)?;
                        self.remaining -= count * 2;
                    }
                },
            }
        }

        Ok(consumed)
    }

    fn literal<S: PixelSink>(&mut self, byte: u8, sink: &mut S) -> Result<(), S::Error> {
        if let Some(pixel) = self.assembler.push(byte) {
            sink.emit(pixel, 1)?;
            self.remaining -= 2;
        }
        Ok(())
    }
}
