//! Backpressure ring buffer
//!
//! Holds bulk OUT packets that arrived while the engine was busy pushing
//! pixels. Byte order is preserved end to end; the engine only ever consumes
//! from the front.
//!
//! ```text
//!  USB packets ──store_packet()──▶ [ len | bytes ][ len | bytes ] ──read_packet()──▶ rx
//!                                 └──────────── RING_CAPACITY ────────────┘
//! ```
//!
//! Each packet is stored behind a one-byte length so BitBlt continuation
//! bytes can still be found at packet starts. Packets are only stored whole.
//! The plain byte interface evicts the oldest byte when full; losses are
//! counted, never reported to the host.

use heapless::spsc::Queue;
use portable_atomic::{AtomicUsize, Ordering};

/// Bytes the USB ring can hold
pub const RING_CAPACITY: usize = 32 * 1024;

/// Queue slots backing [`UsbRing`] (one slot stays empty)
pub const RING_SLOTS: usize = RING_CAPACITY + 1;

/// Ring sized for the firmware's USB receive path
pub type UsbRing = RingBuffer<RING_SLOTS>;

/// Fixed-capacity FIFO byte queue holding up to `N - 1` bytes
pub struct RingBuffer<const N: usize> {
    queue: Queue<u8, N>,
    dropped: AtomicUsize,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Append one byte, evicting the oldest byte if the ring is full
    pub fn store(&mut self, byte: u8) {
        if let Err(byte) = self.queue.enqueue(byte) {
            let _ = self.queue.dequeue();
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let _ = self.queue.enqueue(byte);
        }
    }

    /// Append a whole transport packet behind a one-byte length prefix
    ///
    /// Nothing is evicted: returns false, storing nothing, unless the ring
    /// has room for the prefix and every byte of the packet.
    pub fn store_packet(&mut self, packet: &[u8]) -> bool {
        if packet.is_empty() || packet.len() > u8::MAX as usize || packet.len() >= self.free() {
            return false;
        }

        let _ = self.queue.enqueue(packet.len() as u8);
        for &byte in packet {
            let _ = self.queue.enqueue(byte);
        }
        true
    }

    /// Pop one packet stored by [`store_packet`](Self::store_packet)
    ///
    /// Returns the number of bytes copied into `buf`. Packet bytes that do
    /// not fit are discarded and counted as dropped.
    pub fn read_packet(&mut self, buf: &mut [u8]) -> usize {
        let Some(len) = self.queue.dequeue() else {
            return 0;
        };
        let len = len as usize;
        let take = len.min(buf.len());
        let copied = self.read_into(&mut buf[..take]);

        for _ in copied..len {
            if self.queue.dequeue().is_some() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        copied
    }

    /// Pop the oldest byte
    pub fn read(&mut self) -> Option<u8> {
        self.queue.dequeue()
    }

    /// Pop up to `buf.len()` bytes, returning how many were copied
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.queue.dequeue() {
                Some(byte) => *slot = byte,
                None => break,
            }
            count += 1;
        }
        count
    }

    /// Bytes waiting to be read
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Bytes that can be stored without eviction
    pub fn free(&self) -> usize {
        self.capacity() - self.available()
    }

    /// Total bytes lost to overflow since creation
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
