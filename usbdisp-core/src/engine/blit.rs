//! BitBlt payload reception
//!
//! The first packet of the frame holds the fixed header followed by payload
//! bytes; every later packet starts with a continuation byte carrying the
//! opcode. The header may start anywhere in its packet and any packet may
//! be short, so continuation bytes are found at real packet starts.
//!
//! ```text
//! [ ... 0x84 x y w h | pixel bytes ... ][ 0x04 | pixel bytes ... ][ 0x04 | ... ]
//! ```
//!
//! A target rectangle that does not fit the panel, or a display error while
//! drawing, does not stop reception: the payload is still consumed so the
//! next frame is found, and the error is reported once it ends. A size whose
//! byte count does not fit in 32 bits is rejected before any payload is read.

use core::convert::Infallible;

use heapless::Vec;
use usbdisp_hal::{DisplaySink, Transport};
use usbdisp_protocol::header::is_continuation_of;
use usbdisp_protocol::{BitBltCommand, CommandHeader, PayloadDecoder, PixelSink};

use super::{fits, Activity, Engine, EngineError, State, PIXEL_BATCH};

/// In-flight BitBlt
pub(super) struct BlitJob {
    header: CommandHeader,
    command: BitBltCommand,
    decoder: PayloadDecoder,
    /// The front of the receive buffer is the first byte of a packet
    at_packet_start: bool,
    error: Option<EngineError>,
}

/// Batches decoded pixels into `push_pixels` calls
struct PixelWriter<'a, D: DisplaySink> {
    display: &'a mut D,
    error: &'a mut Option<EngineError>,
    batch: Vec<u16, PIXEL_BATCH>,
}

impl<'a, D: DisplaySink> PixelWriter<'a, D> {
    fn new(display: &'a mut D, error: &'a mut Option<EngineError>) -> Self {
        Self {
            display,
            error,
            batch: Vec::new(),
        }
    }

    fn flush(&mut self) {
        if !self.batch.is_empty() && self.error.is_none() {
            if let Err(e) = self.display.push_pixels(&self.batch) {
                *self.error = Some(e.into());
            }
        }
        self.batch.clear();
    }
}

impl<D: DisplaySink> PixelSink for PixelWriter<'_, D> {
    type Error = Infallible;

    fn emit(&mut self, color: u16, count: u32) -> Result<(), Infallible> {
        if self.error.is_some() {
            return Ok(());
        }

        for _ in 0..count {
            if self.batch.is_full() {
                self.flush();
            }
            let _ = self.batch.push(color);
        }
        Ok(())
    }
}

impl<'r, T, D, const N: usize> Engine<'r, T, D, N>
where
    T: Transport,
    D: DisplaySink,
{
    pub(super) fn begin_blit(
        &mut self,
        header: CommandHeader,
        command: BitBltCommand,
    ) -> Result<Activity, EngineError> {
        let Some(payload_len) = command.payload_len() else {
            return self.complete(header, command.opcode(), Err(EngineError::OutOfBounds));
        };

        let mut job = BlitJob {
            header,
            command,
            decoder: PayloadDecoder::new(command.compression, payload_len),
            at_packet_start: false,
            error: None,
        };

        if !fits(command.x, command.y, command.width, command.height, self.display.size()) {
            job.error = Some(EngineError::OutOfBounds);
        } else if command.pixel_count() > 0 {
            if let Err(e) = self
                .display
                .set_window(command.x, command.y, command.width, command.height)
            {
                job.error = Some(e.into());
            }
        }

        self.state = State::Payload(job);
        self.continue_blit()
    }

    /// Consume payload bytes up to the end of the current packet
    pub(super) fn continue_blit(&mut self) -> Result<Activity, EngineError> {
        let State::Payload(mut job) = core::mem::replace(&mut self.state, State::Scan) else {
            return Ok(Activity::Idle);
        };
        let opcode = job.command.opcode();
        let mut progressed = false;

        loop {
            if job.decoder.is_complete() {
                let result = match job.error {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
                return self.complete(job.header, opcode, result);
            }

            if self.rx().is_empty() {
                if !self.fill_rx() {
                    self.state = State::Payload(job);
                    return Ok(if progressed {
                        Activity::Pending
                    } else {
                        Activity::Idle
                    });
                }
                job.at_packet_start = true;
            }

            if job.at_packet_start {
                let next = self.rx()[0];
                if !is_continuation_of(next, opcode) {
                    // Leave the byte in place; it may start the next frame
                    self.stats.desyncs += 1;
                    let error = EngineError::PayloadDesync {
                        expected: opcode.to_byte(),
                        found: next,
                    };
                    return self.complete(job.header, opcode, Err(error));
                }
                self.consume(1);
                job.at_packet_start = false;
                progressed = true;
                continue;
            }

            // The buffer never holds more than the rest of the current packet
            let input = &self.rx[self.rx_start..self.rx_end];
            let mut writer = PixelWriter::new(&mut self.display, &mut job.error);
            let consumed = job
                .decoder
                .decode(input, &mut writer)
                .unwrap_or_else(|never| match never {});
            writer.flush();

            self.consume(consumed);
            self.drain();

            // Yield to the caller once per packet
            if self.rx().is_empty() && !job.decoder.is_complete() {
                self.state = State::Payload(job);
                return Ok(Activity::Pending);
            }
            progressed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::{run, MockTransport, Op, RecordingDisplay};
    use super::super::Completion;
    use super::*;
    use crate::config::EngineConfig;
    use crate::ring::RingBuffer;
    use usbdisp_protocol::color::{BLUE, GREEN, RED};
    use usbdisp_protocol::{Command, Compression, Frame, Opcode, PayloadPacketizer};

    type TestRing = RingBuffer<1025>;

    fn engine(ring: &mut TestRing) -> Engine<'_, MockTransport, RecordingDisplay, 1025> {
        Engine::new(
            MockTransport::new(),
            RecordingDisplay::new(320, 240),
            ring,
            EngineConfig::default(),
        )
        .unwrap()
    }

    fn header(x: u16, y: u16, width: u16, height: u16, compression: Compression) -> [u8; 9] {
        let mut bytes = [0u8; 9];
        Frame::new(Command::BitBlt(BitBltCommand {
            x,
            y,
            width,
            height,
            compression,
        }))
        .encode(&mut bytes)
        .unwrap();
        bytes
    }

    fn push_frame(
        engine: &mut Engine<'_, MockTransport, RecordingDisplay, 1025>,
        header: &[u8],
        payload: &[u8],
        opcode: Opcode,
    ) {
        for packet in PayloadPacketizer::new(header, payload, opcode, 64) {
            engine.transport_mut().push(&packet);
        }
    }

    #[test]
    fn test_rle_two_green_pixels() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let mut frame = header(0, 0, 2, 1, Compression::Rle).to_vec();
        frame.extend_from_slice(&[0x81, 0xE0, 0x07]);
        engine.transport_mut().push(&frame);
        let results = run(&mut engine);

        assert_eq!(
            results,
            vec![Ok(Activity::Completed(Completion {
                opcode: Opcode::BitBltRle,
                status_sent: true
            }))]
        );
        assert_eq!(
            engine.display().ops,
            vec![Op::Window(0, 0, 2, 1), Op::Pixels(vec![GREEN, GREEN])]
        );
    }

    #[test]
    fn test_raw_multi_packet() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let pixels: std::vec::Vec<u16> = (0..100).collect();
        let payload: std::vec::Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
        let header = header(10, 20, 10, 10, Compression::Raw);
        push_frame(&mut engine, &header, &payload, Opcode::BitBlt);

        let results = run(&mut engine);

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Ok(Activity::Completed(_))));
        assert_eq!(engine.display().ops[0], Op::Window(10, 20, 10, 10));
        assert_eq!(engine.display().pixels(), pixels);
        assert!(!engine.in_payload());
    }

    #[test]
    fn test_rle_multi_packet() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let pixels: std::vec::Vec<u16> = (0..400u16).map(|i| if i % 7 < 3 { RED } else { i }).collect();
        let mut encoded = vec![0u8; usbdisp_protocol::rle::max_encoded_len(pixels.len())];
        let len = usbdisp_protocol::rle::encode(&pixels, &mut encoded).unwrap();
        let header = header(0, 0, 20, 20, Compression::Rle);
        push_frame(&mut engine, &header, &encoded[..len], Opcode::BitBltRle);

        let results = run(&mut engine);

        assert_eq!(results.len(), 1);
        assert_eq!(engine.display().pixels(), pixels);
    }

    #[test]
    fn test_desync_then_valid_frame() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        // 2x20 window needs 80 payload bytes; first packet carries 55
        let mut first = header(0, 0, 2, 20, Compression::Raw).to_vec();
        first.resize(64, 0x11);
        engine.transport_mut().push(&first);
        // Second packet starts a new frame instead of continuing
        engine.transport_mut().push(&[0x81, 0x1F, 0x00]);

        let results = run(&mut engine);

        assert_eq!(
            results[0],
            Err(EngineError::PayloadDesync {
                expected: 0x04,
                found: 0x81
            })
        );
        assert!(matches!(
            results[1],
            Ok(Activity::Completed(Completion {
                opcode: Opcode::Fill,
                ..
            }))
        ));
        assert_eq!(engine.display().ops.last(), Some(&Op::Fill(BLUE)));
        assert_eq!(engine.stats().desyncs, 1);
        assert!(engine.is_dirty());
        // Abort and fill both reported
        assert_eq!(engine.transport().sent.len(), 2);
        assert_eq!(engine.transport().sent[0][1], 0x80);
    }

    #[test]
    fn test_trailing_bytes_start_next_frame() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let mut packet = header(0, 0, 1, 1, Compression::Raw).to_vec();
        packet.extend_from_slice(&[0x00, 0xF8]);
        packet.extend_from_slice(&[0x81, 0xE0, 0x07]);
        engine.transport_mut().push(&packet);

        let results = run(&mut engine);

        assert_eq!(results.len(), 2);
        assert_eq!(
            engine.display().ops,
            vec![Op::Window(0, 0, 1, 1), Op::Pixels(vec![RED]), Op::Fill(GREEN)]
        );
    }

    #[test]
    fn test_out_of_bounds_consumes_payload() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let mut packet = header(319, 0, 2, 1, Compression::Raw).to_vec();
        packet.extend_from_slice(&[0xFF; 4]);
        packet.extend_from_slice(&[0x80]);
        engine.transport_mut().push(&packet);

        let results = run(&mut engine);

        assert_eq!(results[0], Err(EngineError::OutOfBounds));
        assert!(matches!(results[1], Ok(Activity::Completed(_))));
        assert!(engine.display().ops.is_empty());
    }

    #[test]
    fn test_display_error_reported_after_payload() {
        let mut ring = TestRing::new();
        let mut display = RecordingDisplay::new(320, 240);
        display.fail = true;
        let mut engine =
            Engine::new(MockTransport::new(), display, &mut ring, EngineConfig::default()).unwrap();

        let mut packet = header(0, 0, 1, 1, Compression::Raw).to_vec();
        packet.extend_from_slice(&[0x00, 0x00]);
        engine.transport_mut().push(&packet);

        let results = run(&mut engine);

        assert_eq!(
            results,
            vec![Err(EngineError::Display(usbdisp_hal::DisplayError::Communication))]
        );
        assert!(!engine.in_payload());
    }

    #[test]
    fn test_payload_waits_for_more_packets() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let mut first = header(0, 0, 40, 1, Compression::Raw).to_vec();
        first.resize(64, 0x00);
        engine.transport_mut().push(&first);

        assert!(run(&mut engine).is_empty());
        assert!(engine.in_payload());

        let mut second = vec![0x84];
        second.resize(26, 0x00);
        engine.transport_mut().push(&second);

        let results = run(&mut engine);
        assert_eq!(results.len(), 1);
        assert_eq!(engine.display().pixels().len(), 40);
    }

    #[test]
    fn test_blit_starts_mid_packet() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        // Fill, then a 2x20 BitBlt whose first 52 payload bytes share the packet
        let mut first = vec![0x81, 0x00, 0xF8];
        first.extend_from_slice(&header(0, 0, 2, 20, Compression::Raw));
        first.resize(64, 0x11);
        let mut second = vec![0x04];
        second.resize(29, 0x22);
        engine.transport_mut().push(&first);
        engine.transport_mut().push(&second);

        let results = run(&mut engine);

        assert_eq!(
            results,
            vec![
                Ok(Activity::Completed(Completion {
                    opcode: Opcode::Fill,
                    status_sent: true
                })),
                Ok(Activity::Completed(Completion {
                    opcode: Opcode::BitBlt,
                    status_sent: true
                })),
            ]
        );
        let mut expected = vec![0x1111; 26];
        expected.extend_from_slice(&[0x2222; 14]);
        assert_eq!(engine.display().pixels(), expected);
        assert_eq!(engine.stats().desyncs, 0);
    }

    #[test]
    fn test_header_only_first_packet() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        engine.transport_mut().push(&header(0, 0, 1, 1, Compression::Raw));
        engine.transport_mut().push(&[0x04, 0x00, 0xF8]);

        let results = run(&mut engine);

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Ok(Activity::Completed(_))));
        assert_eq!(engine.display().pixels(), vec![RED]);
    }

    #[test]
    fn test_short_continuation_packets() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let mut first = header(0, 0, 8, 1, Compression::Raw).to_vec();
        first.extend_from_slice(&[1, 0, 2, 0, 3, 0]);
        engine.transport_mut().push(&first);
        engine.transport_mut().push(&[0x04, 4, 0, 5, 0]);
        engine.transport_mut().push(&[0x04, 6, 0, 7, 0, 8, 0]);
        engine.transport_mut().push(&[0x81, 0x1F, 0x00]);

        let results = run(&mut engine);

        assert_eq!(results.len(), 2);
        assert_eq!(engine.display().pixels(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(engine.display().ops.last(), Some(&Op::Fill(BLUE)));
    }

    #[test]
    fn test_short_packet_does_not_hide_desync() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        let mut first = header(0, 0, 4, 1, Compression::Raw).to_vec();
        first.extend_from_slice(&[1, 0]);
        engine.transport_mut().push(&first);
        // Raw pixel bytes where a continuation byte belongs
        engine.transport_mut().push(&[2, 0, 3, 0, 4, 0]);

        let results = run(&mut engine);

        assert_eq!(
            results[0],
            Err(EngineError::PayloadDesync {
                expected: 0x04,
                found: 0x02
            })
        );
        assert_eq!(engine.display().pixels(), vec![1]);
    }

    #[test]
    fn test_oversized_blit_rejected_without_payload() {
        let mut ring = TestRing::new();
        let mut engine = engine(&mut ring);

        engine.transport_mut().push(&[0x84, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        engine.transport_mut().push(&[0x80]);

        let results = run(&mut engine);

        assert_eq!(results[0], Err(EngineError::OutOfBounds));
        assert!(matches!(
            results[1],
            Ok(Activity::Completed(Completion {
                opcode: Opcode::Nop,
                ..
            }))
        ));
        assert!(!engine.in_payload());
        assert!(engine.display().ops.is_empty());
    }
}
