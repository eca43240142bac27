//! Test doubles for the engine

use std::collections::VecDeque;
use std::vec::Vec;

use usbdisp_hal::{DisplayError, DisplaySink, Endpoint, Transport};

use super::{Activity, Engine, EngineError};

/// Transport fed packet by packet from the test
pub struct MockTransport {
    packets: VecDeque<Vec<u8>>,
    offset: usize,
    pub sent: Vec<Vec<u8>>,
    pub fail_sends: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            packets: VecDeque::new(),
            offset: 0,
            sent: Vec::new(),
            fail_sends: false,
        }
    }

    /// Queue one bulk OUT packet
    pub fn push(&mut self, packet: &[u8]) {
        self.packets.push_back(packet.to_vec());
    }

    /// Packets not yet fully received
    pub fn queued(&self) -> usize {
        self.packets.len()
    }
}

impl Transport for MockTransport {
    type Error = ();

    fn available(&mut self, endpoint: Endpoint) -> usize {
        match (endpoint, self.packets.front()) {
            (Endpoint::BulkOut, Some(packet)) => packet.len() - self.offset,
            _ => 0,
        }
    }

    fn recv(&mut self, endpoint: Endpoint, buf: &mut [u8]) -> Result<usize, ()> {
        if !endpoint.is_out() {
            return Err(());
        }
        let Some(packet) = self.packets.front() else {
            return Ok(0);
        };

        let n = buf.len().min(packet.len() - self.offset);
        buf[..n].copy_from_slice(&packet[self.offset..self.offset + n]);
        self.offset += n;

        if self.offset == packet.len() {
            self.packets.pop_front();
            self.offset = 0;
        }
        Ok(n)
    }

    fn send(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<usize, ()> {
        if self.fail_sends || endpoint.is_out() {
            return Err(());
        }
        self.sent.push(data.to_vec());
        Ok(data.len())
    }
}

/// Recorded display call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Fill(u16),
    FillRect(u16, u16, u16, u16, u16),
    Window(u16, u16, u16, u16),
    Pixels(Vec<u16>),
}

/// Display that records calls instead of drawing
pub struct RecordingDisplay {
    width: u16,
    height: u16,
    pub ops: Vec<Op>,
    pub fail: bool,
}

impl RecordingDisplay {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            fail: false,
        }
    }

    /// All pushed pixels, concatenated
    pub fn pixels(&self) -> Vec<u16> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Pixels(p) => Some(p.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn check(&self) -> Result<(), DisplayError> {
        if self.fail {
            Err(DisplayError::Communication)
        } else {
            Ok(())
        }
    }
}

impl DisplaySink for RecordingDisplay {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn fill(&mut self, color: u16) -> Result<(), DisplayError> {
        self.check()?;
        self.ops.push(Op::Fill(color));
        Ok(())
    }

    fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: u16,
    ) -> Result<(), DisplayError> {
        self.check()?;
        self.ops.push(Op::FillRect(x, y, width, height, color));
        Ok(())
    }

    fn set_window(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
        self.check()?;
        self.ops.push(Op::Window(x, y, width, height));
        Ok(())
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<(), DisplayError> {
        self.check()?;
        self.ops.push(Op::Pixels(pixels.to_vec()));
        Ok(())
    }

    fn read_rect(
        &mut self,
        _x: u16,
        _y: u16,
        _width: u16,
        _height: u16,
        _buf: &mut [u16],
    ) -> Result<(), DisplayError> {
        Err(DisplayError::NotInitialized)
    }
}

/// Poll until the engine runs out of input
///
/// Returns every result except `Pending`.
pub fn run<D: DisplaySink, const N: usize>(
    engine: &mut Engine<'_, MockTransport, D, N>,
) -> Vec<Result<Activity, EngineError>> {
    let mut results = Vec::new();

    for _ in 0..10_000 {
        match engine.poll() {
            Ok(Activity::Idle) => break,
            Ok(Activity::Pending) => {}
            other => results.push(other),
        }
    }

    results
}
