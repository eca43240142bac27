//! RGB565 color helpers

pub const BLACK: u16 = 0x0000;
pub const RED: u16 = 0xF800;
pub const GREEN: u16 = 0x07E0;
pub const BLUE: u16 = 0x001F;
pub const WHITE: u16 = 0xFFFF;

/// Pack 8-bit channels into RGB565
pub const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Expand RGB565 into 8-bit channels
///
/// Low bits are filled by replicating the high bits, so white stays white.
pub const fn channels(color: u16) -> (u8, u8, u8) {
    let r = ((color >> 11) & 0x1F) as u8;
    let g = ((color >> 5) & 0x3F) as u8;
    let b = (color & 0x1F) as u8;
    ((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
}

/// Pack 6-bit-per-channel values (as read back from many TFT controllers)
pub const fn from_rgb666(r: u8, g: u8, b: u8) -> u16 {
    rgb565(r, g, b)
}
