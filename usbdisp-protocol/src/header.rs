//! Command header byte
//!
//! ```text
//!   7            6             5..0
//! ┌────────────┬─────────────┬────────┐
//! │ FRAME_START│ CLEAR_DIRTY │ OPCODE │
//! └────────────┴─────────────┴────────┘
//! ```

/// Set on the first byte of every frame
pub const FLAG_FRAME_START: u8 = 0x80;

/// Ask the device to clear its DIRTY flag once the command completes
pub const FLAG_CLEAR_DIRTY: u8 = 0x40;

/// Opcode bits of the header byte
pub const OPCODE_MASK: u8 = 0x3F;

// Wire format values
const OP_NOP: u8 = 0x00;
const OP_FILL: u8 = 0x01;
const OP_RECT: u8 = 0x02;
const OP_COPY_AREA: u8 = 0x03;
const OP_BITBLT: u8 = 0x04;
const OP_BITBLT_RLE: u8 = 0x05;

/// Command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    /// No drawing; still reports status
    Nop,
    /// Fill the whole panel
    Fill,
    /// Fill a rectangle
    Rect,
    /// Copy a rectangle of the panel to another position
    CopyArea,
    /// Raw pixel transfer
    BitBlt,
    /// Run-length encoded pixel transfer
    BitBltRle,
}

impl Opcode {
    /// Parse an opcode from the low bits of a header byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte & OPCODE_MASK {
            OP_NOP => Some(Opcode::Nop),
            OP_FILL => Some(Opcode::Fill),
            OP_RECT => Some(Opcode::Rect),
            OP_COPY_AREA => Some(Opcode::CopyArea),
            OP_BITBLT => Some(Opcode::BitBlt),
            OP_BITBLT_RLE => Some(Opcode::BitBltRle),
            _ => None,
        }
    }

    /// Convert to wire format bits
    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Nop => OP_NOP,
            Opcode::Fill => OP_FILL,
            Opcode::Rect => OP_RECT,
            Opcode::CopyArea => OP_COPY_AREA,
            Opcode::BitBlt => OP_BITBLT,
            Opcode::BitBltRle => OP_BITBLT_RLE,
        }
    }

    /// Size of the fixed header, header byte included
    pub fn header_len(self) -> usize {
        match self {
            Opcode::Nop => 1,
            Opcode::Fill => 1 + 2,
            Opcode::Rect => 1 + 4 * 2 + 2,
            Opcode::CopyArea => 1 + 6 * 2,
            Opcode::BitBlt | Opcode::BitBltRle => 1 + 4 * 2,
        }
    }

    /// Returns true if a pixel payload follows the fixed header
    pub fn has_payload(self) -> bool {
        matches!(self, Opcode::BitBlt | Opcode::BitBltRle)
    }
}

/// First byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandHeader(u8);

impl CommandHeader {
    /// Wrap a raw header byte
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Header starting a new frame for `opcode`
    pub fn new(opcode: Opcode) -> Self {
        Self(FLAG_FRAME_START | opcode.to_byte())
    }

    /// Same header with CLEAR_DIRTY set
    pub fn with_clear_dirty(self) -> Self {
        Self(self.0 | FLAG_CLEAR_DIRTY)
    }

    /// Raw byte
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// Returns true if this byte may start a frame
    pub const fn is_frame_start(self) -> bool {
        self.0 & FLAG_FRAME_START != 0
    }

    /// Returns true if DIRTY should be cleared on completion
    pub const fn clears_dirty(self) -> bool {
        self.0 & FLAG_CLEAR_DIRTY != 0
    }

    /// Raw opcode bits
    pub const fn opcode_bits(self) -> u8 {
        self.0 & OPCODE_MASK
    }

    /// Decoded opcode, if known
    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_byte(self.0)
    }
}

/// Returns true if `byte` is a valid continuation marker for `opcode`
///
/// Continuation packets of a BitBlt payload re-assert the opcode in their
/// first byte. Only the opcode bits are compared.
pub fn is_continuation_of(byte: u8, opcode: Opcode) -> bool {
    byte & OPCODE_MASK == opcode.to_byte()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let opcodes = [
            Opcode::Nop,
            Opcode::Fill,
            Opcode::Rect,
            Opcode::CopyArea,
            Opcode::BitBlt,
            Opcode::BitBltRle,
        ];

        for op in opcodes {
            assert_eq!(Opcode::from_byte(op.to_byte()), Some(op));
            // Flags do not change the opcode
            assert_eq!(
                Opcode::from_byte(op.to_byte() | FLAG_FRAME_START | FLAG_CLEAR_DIRTY),
                Some(op)
            );
        }
    }

    #[test]
    fn test_unknown_opcode() {
        assert!(Opcode::from_byte(0x06).is_none());
        assert!(Opcode::from_byte(0x3F).is_none());
        assert!(CommandHeader::from_byte(0x80 | 0x2A).opcode().is_none());
    }

    #[test]
    fn test_header_flags() {
        let header = CommandHeader::new(Opcode::Fill).with_clear_dirty();
        assert_eq!(header.to_byte(), 0xC1);
        assert!(header.is_frame_start());
        assert!(header.clears_dirty());
        assert_eq!(header.opcode(), Some(Opcode::Fill));

        let plain = CommandHeader::from_byte(0x04);
        assert!(!plain.is_frame_start());
        assert!(!plain.clears_dirty());
        assert_eq!(plain.opcode_bits(), 0x04);
    }

    #[test]
    fn test_header_lengths() {
        assert_eq!(Opcode::Nop.header_len(), 1);
        assert_eq!(Opcode::Fill.header_len(), 3);
        assert_eq!(Opcode::Rect.header_len(), 11);
        assert_eq!(Opcode::CopyArea.header_len(), 13);
        assert_eq!(Opcode::BitBlt.header_len(), 9);
        assert_eq!(Opcode::BitBltRle.header_len(), 9);
    }

    #[test]
    fn test_continuation_marker() {
        assert!(is_continuation_of(0x04, Opcode::BitBlt));
        assert!(is_continuation_of(0x84, Opcode::BitBlt));
        assert!(!is_continuation_of(0x05, Opcode::BitBlt));
        assert!(is_continuation_of(0x05, Opcode::BitBltRle));
    }
}
