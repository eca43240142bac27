//! Protocol engine
//!
//! Pulls the command stream off the bulk OUT endpoint, parses frames, runs
//! the draw handlers against a [`DisplaySink`] and reports status on the
//! interrupt IN endpoint.
//!
//! ```text
//!             drain()              fill_rx()
//! Transport ─────────▶ RingBuffer ──────────▶ rx ──▶ SCAN ──▶ handler ──▶ DisplaySink
//!     ▲                                               │ ▲        │
//!     │                                               ▼ │        │
//!     │                                            PAYLOAD       │
//!     └───────────────── StatusPacket ◀──────────────────────────┘
//! ```
//!
//! The engine never blocks. Each [`Engine::poll`] call does whatever the
//! buffered bytes allow and returns. While a slow display operation is in
//! flight, the transport is drained into the ring buffer between batches so
//! the USB endpoint keeps being serviced.

mod blit;
mod handlers;
mod status;

#[cfg(test)]
mod mock;

pub use status::StatusReporter;

use usbdisp_hal::{DisplayError, DisplaySink, Endpoint, Transport};
use usbdisp_protocol::{
    Command, CommandHeader, Frame, FrameError, Opcode, MAX_HEADER_LEN, MAX_PACKET_SIZE,
};

use crate::config::{ConfigError, EngineConfig};
use crate::ring::{RingBuffer, RING_SLOTS};

use blit::BlitJob;

/// Receive buffer size (a partial header plus one full-speed bulk packet)
pub const RX_BUFFER_LEN: usize = MAX_HEADER_LEN + MAX_PACKET_SIZE;

/// Pixels CopyArea can move per strip
pub const COPY_SCRATCH_PIXELS: usize = 1024;

/// Pixels pushed to the display per call during a BitBlt
pub const PIXEL_BATCH: usize = 32;

/// Engine errors
///
/// Every error leaves the engine ready for the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// Bytes without FRAME_START were skipped
    Framing { discarded: usize },
    /// Header named an unknown opcode
    UnknownOpcode(u8),
    /// BitBlt continuation packet did not start with the command's opcode
    PayloadDesync { expected: u8, found: u8 },
    /// CopyArea row does not fit the scratch buffer
    OutOfMemory,
    /// FillRect with `left > right` or `top > bottom`
    InvalidRect,
    /// Rectangle extends past the panel
    OutOfBounds,
    /// Display sink failed
    Display(DisplayError),
    /// Status packet could not be queued
    Transport,
}

impl From<DisplayError> for EngineError {
    fn from(e: DisplayError) -> Self {
        EngineError::Display(e)
    }
}

/// A command that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    pub opcode: Opcode,
    /// False if the status packet could not be sent
    pub status_sent: bool,
}

/// Outcome of one [`Engine::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Activity {
    /// No progress possible with the bytes at hand
    Idle,
    /// BitBlt payload consumed, command still running
    Pending,
    Completed(Completion),
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStats {
    pub frames_completed: u32,
    pub framing_errors: u32,
    pub desyncs: u32,
    pub unknown_opcodes: u32,
    /// Commands that ended in an error (DIRTY set)
    pub aborted: u32,
    pub status_dropped: u32,
    pub transport_errors: u32,
    pub ring_dropped: usize,
}

enum State {
    Scan,
    Payload(BlitJob),
}

/// USB display protocol engine
pub struct Engine<'r, T, D, const N: usize = RING_SLOTS>
where
    T: Transport,
    D: DisplaySink,
{
    transport: T,
    display: D,
    ring: &'r mut RingBuffer<N>,
    config: EngineConfig,
    rx: [u8; RX_BUFFER_LEN],
    rx_start: usize,
    rx_end: usize,
    state: State,
    status: StatusReporter,
    scratch: [u16; COPY_SCRATCH_PIXELS],
    stats: EngineStats,
}

impl<'r, T, D, const N: usize> Engine<'r, T, D, N>
where
    T: Transport,
    D: DisplaySink,
{
    /// Create an engine over a transport, a display and a ring buffer
    pub fn new(
        transport: T,
        display: D,
        ring: &'r mut RingBuffer<N>,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            transport,
            display,
            ring,
            config,
            rx: [0; RX_BUFFER_LEN],
            rx_start: 0,
            rx_end: 0,
            state: State::Scan,
            status: StatusReporter::new(),
            scratch: [0; COPY_SCRATCH_PIXELS],
            stats: EngineStats::default(),
        })
    }

    /// Announce the initial (DIRTY) status to the host
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.send_status() {
            Ok(())
        } else {
            Err(EngineError::Transport)
        }
    }

    /// Make as much progress as the buffered bytes allow
    pub fn poll(&mut self) -> Result<Activity, EngineError> {
        self.drain();

        match self.state {
            State::Scan => self.scan(),
            State::Payload(_) => self.continue_blit(),
        }
    }

    /// Returns true while a BitBlt payload is being received
    pub fn in_payload(&self) -> bool {
        matches!(self.state, State::Payload(_))
    }

    pub fn is_dirty(&self) -> bool {
        self.status.is_dirty()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            ring_dropped: self.ring.dropped(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Move queued bulk OUT packets into the ring buffer
    ///
    /// A packet is only taken while the ring has room for all of it; otherwise
    /// it stays in the transport, which keeps NAKing the host.
    pub fn drain(&mut self) {
        let mut packet = [0u8; MAX_PACKET_SIZE];

        loop {
            let pending = self.transport.available(Endpoint::BulkOut);
            // One extra byte for the length prefix
            if pending == 0 || pending.min(MAX_PACKET_SIZE) >= self.ring.free() {
                break;
            }

            match self.transport.recv(Endpoint::BulkOut, &mut packet) {
                Ok(0) => break,
                Ok(n) => {
                    self.ring.store_packet(&packet[..n]);
                }
                Err(_) => {
                    self.stats.transport_errors += 1;
                    break;
                }
            }
        }
    }

    fn scan(&mut self) -> Result<Activity, EngineError> {
        // Only pull the next packet when nothing parseable is buffered
        if matches!(Frame::parse(self.rx()), Err(FrameError::Incomplete)) {
            self.fill_rx();
        }

        let Some(&first) = self.rx().first() else {
            return Ok(Activity::Idle);
        };

        if !CommandHeader::from_byte(first).is_frame_start() {
            let rx = self.rx();
            let discarded = rx
                .iter()
                .position(|&b| CommandHeader::from_byte(b).is_frame_start())
                .unwrap_or(rx.len());
            self.consume(discarded);
            self.stats.framing_errors += 1;
            return Err(EngineError::Framing { discarded });
        }

        let frame = match Frame::parse(self.rx()) {
            Ok(frame) => frame,
            Err(FrameError::UnknownOpcode(bits)) => {
                self.consume(1);
                self.stats.unknown_opcodes += 1;
                return Err(EngineError::UnknownOpcode(bits));
            }
            // Partial header stays buffered until the rest arrives
            Err(_) => return Ok(Activity::Idle),
        };

        self.consume(frame.header_len());
        self.dispatch(frame)
    }

    fn dispatch(&mut self, frame: Frame) -> Result<Activity, EngineError> {
        let opcode = frame.command.opcode();

        let result = match frame.command {
            Command::Nop => Ok(()),
            Command::Fill(cmd) => self.fill(cmd),
            Command::FillRect(cmd) => self.fill_rect(cmd),
            Command::CopyArea(cmd) => self.copy_area(cmd),
            Command::BitBlt(cmd) => return self.begin_blit(frame.header, cmd),
        };

        self.complete(frame.header, opcode, result)
    }

    /// Update DIRTY, report status and return to SCAN
    fn complete(
        &mut self,
        header: CommandHeader,
        opcode: Opcode,
        result: Result<(), EngineError>,
    ) -> Result<Activity, EngineError> {
        match result {
            Ok(()) => {
                if header.clears_dirty() {
                    self.status.clear_dirty();
                }
                self.stats.frames_completed += 1;
            }
            Err(_) => {
                self.status.mark_dirty();
                self.stats.aborted += 1;
            }
        }

        self.state = State::Scan;
        let status_sent = self.send_status();
        self.drain();

        result.map(|()| Activity::Completed(Completion { opcode, status_sent }))
    }

    fn send_status(&mut self) -> bool {
        let packet = self.status.packet().encode();

        match self.transport.send(Endpoint::InterruptIn, &packet) {
            Ok(n) if n == packet.len() => true,
            _ => {
                self.stats.status_dropped += 1;
                false
            }
        }
    }

    fn rx(&self) -> &[u8] {
        &self.rx[self.rx_start..self.rx_end]
    }

    fn consume(&mut self, count: usize) {
        self.rx_start = (self.rx_start + count).min(self.rx_end);
        if self.rx_start == self.rx_end {
            self.rx_start = 0;
            self.rx_end = 0;
        }
    }

    /// Append the next whole packet to the receive buffer, ring buffer first
    ///
    /// Called only when the buffer is empty or holds a partial header, so a
    /// full packet always fits. Returns true if a packet was appended.
    fn fill_rx(&mut self) -> bool {
        if self.rx_start > 0 {
            self.rx.copy_within(self.rx_start..self.rx_end, 0);
            self.rx_end -= self.rx_start;
            self.rx_start = 0;
        }

        let free = RX_BUFFER_LEN - self.rx_end;
        if free < MAX_PACKET_SIZE {
            return false;
        }
        let buf = &mut self.rx[self.rx_end..self.rx_end + MAX_PACKET_SIZE];

        // Live packets are newer than anything in the ring
        let n = if !self.ring.is_empty() {
            self.ring.read_packet(buf)
        } else {
            match self.transport.recv(Endpoint::BulkOut, buf) {
                Ok(n) => n,
                Err(_) => {
                    self.stats.transport_errors += 1;
                    0
                }
            }
        };

        self.rx_end += n;
        n > 0
    }
}

/// Returns true if the rectangle lies inside a `panel_w × panel_h` panel
pub(crate) fn fits(x: u16, y: u16, width: u16, height: u16, (panel_w, panel_h): (u16, u16)) -> bool {
    x as u32 + width as u32 <= panel_w as u32 && y as u32 + height as u32 <= panel_h as u32
}

#[cfg(test)]
mod tests {
    use super::mock::{run, MockTransport, Op, RecordingDisplay};
    use super::*;
    use usbdisp_protocol::color::{GREEN, RED};
    use usbdisp_protocol::{FillCommand, FLAG_CLEAR_DIRTY, FLAG_FRAME_START};

    type TestRing = RingBuffer<1025>;

    fn engine<'r>(
        ring: &'r mut TestRing,
    ) -> Engine<'r, MockTransport, RecordingDisplay, 1025> {
        Engine::new(
            MockTransport::new(),
            RecordingDisplay::new(320, 240),
            ring,
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_start_reports_dirty() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        engine.start().unwrap();

        assert!(engine.is_dirty());
        assert_eq!(engine.transport().sent, vec![vec![0x00, 0x80, 0x00, 0x00, 0x00]]);
    }

    #[test]
    fn test_start_send_failure() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);
        engine.transport_mut().fail_sends = true;

        assert_eq!(engine.start(), Err(EngineError::Transport));
        assert_eq!(engine.stats().status_dropped, 1);
    }

    #[test]
    fn test_idle_without_input() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);
        assert_eq!(engine.poll(), Ok(Activity::Idle));
    }

    #[test]
    fn test_fill_red_clears_dirty() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);
        engine.start().unwrap();

        engine.transport_mut().push(&[FLAG_FRAME_START | FLAG_CLEAR_DIRTY | 0x01, 0x00, 0xF8]);
        let results = run(&mut engine);

        assert_eq!(
            results,
            vec![Ok(Activity::Completed(Completion {
                opcode: Opcode::Fill,
                status_sent: true
            }))]
        );
        assert_eq!(engine.display().ops, vec![Op::Fill(RED)]);
        assert!(!engine.is_dirty());
        assert_eq!(engine.transport().sent.last().unwrap()[1], 0x00);
    }

    #[test]
    fn test_dirty_unchanged_without_flag() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        // Clear first, then a plain NOP must leave it clear
        engine.transport_mut().push(&[FLAG_FRAME_START | FLAG_CLEAR_DIRTY]);
        engine.transport_mut().push(&[FLAG_FRAME_START]);
        run(&mut engine);

        assert!(!engine.is_dirty());
        let sent = &engine.transport().sent;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|packet| packet[1] == 0x00));
    }

    #[test]
    fn test_plain_fill_keeps_dirty() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        engine.transport_mut().push(&[0x81, 0xE0, 0x07]);
        run(&mut engine);

        assert!(engine.is_dirty());
        assert_eq!(engine.display().ops, vec![Op::Fill(GREEN)]);
        assert_eq!(engine.transport().sent.last().unwrap()[1], 0x80);
    }

    #[test]
    fn test_garbage_then_fill() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        engine.transport_mut().push(&[0x00, 0x13, 0x7F, 0x81, 0x00, 0xF8]);
        let results = run(&mut engine);

        assert_eq!(results[0], Err(EngineError::Framing { discarded: 3 }));
        assert!(matches!(results[1], Ok(Activity::Completed(_))));
        assert_eq!(results.len(), 2);
        assert_eq!(engine.display().ops, vec![Op::Fill(RED)]);
        assert_eq!(engine.stats().framing_errors, 1);
    }

    #[test]
    fn test_unknown_opcode_skipped() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        engine.transport_mut().push(&[0xA0, 0x81, 0x00, 0x00]);
        let results = run(&mut engine);

        assert_eq!(results[0], Err(EngineError::UnknownOpcode(0x20)));
        assert!(matches!(results[1], Ok(Activity::Completed(_))));
        assert_eq!(engine.stats().unknown_opcodes, 1);
    }

    #[test]
    fn test_partial_header_persists() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        engine.transport_mut().push(&[0x82, 0, 0, 0, 0]);
        assert_eq!(engine.poll(), Ok(Activity::Idle));
        assert!(engine.display().ops.is_empty());

        engine.transport_mut().push(&[4, 0, 2, 0, 0x1F, 0x00]);
        let results = run(&mut engine);

        assert!(matches!(results[0], Ok(Activity::Completed(_))));
        assert_eq!(engine.display().ops, vec![Op::FillRect(0, 0, 4, 2, 0x001F)]);
    }

    #[test]
    fn test_commands_share_packet() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let mut stream = [0u8; 6];
        Frame::new(Command::Fill(FillCommand { color: RED }))
            .encode(&mut stream[..3])
            .unwrap();
        Frame::new(Command::Fill(FillCommand { color: GREEN }))
            .encode(&mut stream[3..])
            .unwrap();
        engine.transport_mut().push(&stream);
        run(&mut engine);

        assert_eq!(engine.display().ops, vec![Op::Fill(RED), Op::Fill(GREEN)]);
        assert_eq!(engine.stats().frames_completed, 2);
    }

    #[test]
    fn test_status_drop_is_counted() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);
        engine.transport_mut().fail_sends = true;

        engine.transport_mut().push(&[0x80]);
        let results = run(&mut engine);

        assert_eq!(
            results,
            vec![Ok(Activity::Completed(Completion {
                opcode: Opcode::Nop,
                status_sent: false
            }))]
        );
        assert_eq!(engine.stats().status_dropped, 1);
    }

    #[test]
    fn test_drain_respects_ring_space() {
        let mut ring: RingBuffer<65> = RingBuffer::new();
        let mut engine = Engine::new(
            MockTransport::new(),
            RecordingDisplay::new(320, 240),
            &mut ring,
            EngineConfig::default(),
        )
        .unwrap();

        engine.transport_mut().push(&[0x80; 40]);
        engine.transport_mut().push(&[0x80; 40]);
        engine.drain();

        // Second packet does not fit and stays queued
        assert_eq!(engine.transport().queued(), 1);
        assert_eq!(engine.stats().ring_dropped, 0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut ring = TestRing::new();
        let config = EngineConfig {
            packet_size: 4,
            ..EngineConfig::default()
        };

        let result = Engine::new(
            MockTransport::new(),
            RecordingDisplay::new(320, 240),
            &mut ring,
            config,
        );
        assert!(matches!(result, Err(ConfigError::PacketSizeOutOfRange)));
    }
}
