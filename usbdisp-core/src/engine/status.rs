//! Drawing status tracking
//!
//! DIRTY starts set: after power-up the panel holds nothing the host drew.
//! Completed commands clear it only when the host asks with CLEAR_DIRTY;
//! aborted commands always set it.

use usbdisp_protocol::StatusPacket;

/// Long-lived DIRTY state reported to the host
#[derive(Debug, Clone)]
pub struct StatusReporter {
    dirty: bool,
}

impl StatusReporter {
    pub const fn new() -> Self {
        Self { dirty: true }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Packet describing the current state
    pub fn packet(&self) -> StatusPacket {
        StatusPacket::new(self.dirty)
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}
