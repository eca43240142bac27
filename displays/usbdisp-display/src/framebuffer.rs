//! In-memory RGB565 panel
//!
//! Behaves like a TFT controller's frame memory: pixels pushed after
//! `set_window` fill the window row-major and wrap back to its top-left
//! corner when it is full.

use usbdisp_hal::{DisplayError, DisplaySink};

#[derive(Debug, Clone, Copy, Default)]
struct Window {
    x: u16,
    y: u16,
    width: u16,
    height: u16,
}

impl Window {
    fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Framebuffer over caller-provided pixel memory
pub struct Framebuffer<'a> {
    pixels: &'a mut [u16],
    width: u16,
    height: u16,
    window: Window,
    cursor: usize,
}

impl<'a> Framebuffer<'a> {
    /// Wrap `pixels` as a `width × height` panel
    pub fn new(pixels: &'a mut [u16], width: u16, height: u16) -> Result<Self, DisplayError> {
        if pixels.len() < width as usize * height as usize {
            return Err(DisplayError::BufferTooSmall);
        }

        Ok(Self {
            pixels,
            width,
            height,
            window: Window {
                x: 0,
                y: 0,
                width,
                height,
            },
            cursor: 0,
        })
    }

    /// Pixel at (x, y), if on the panel
    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x < self.width && y < self.height {
            Some(self.pixels[self.index(x, y)])
        } else {
            None
        }
    }

    /// Whole panel, row-major
    pub fn as_slice(&self) -> &[u16] {
        &self.pixels[..self.width as usize * self.height as usize]
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn check(&self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
        if x as u32 + width as u32 > self.width as u32 || y as u32 + height as u32 > self.height as u32 {
            return Err(DisplayError::InvalidCoordinates);
        }
        Ok(())
    }
}

impl DisplaySink for Framebuffer<'_> {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: u16,
    ) -> Result<(), DisplayError> {
        self.check(x, y, width, height)?;

        for row in y..y + height {
            let start = self.index(x, row);
            self.pixels[start..start + width as usize].fill(color);
        }
        Ok(())
    }

    fn set_window(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
        self.check(x, y, width, height)?;
        self.window = Window {
            x,
            y,
            width,
            height,
        };
        self.cursor = 0;
        Ok(())
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<(), DisplayError> {
        let window = self.window;
        if window.len() == 0 {
            return Ok(());
        }

        for &pixel in pixels {
            let dx = (self.cursor % window.width as usize) as u16;
            let dy = (self.cursor / window.width as usize) as u16;
            let index = self.index(window.x + dx, window.y + dy);
            self.pixels[index] = pixel;
            self.cursor = (self.cursor + 1) % window.len();
        }
        Ok(())
    }

    fn read_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        buf: &mut [u16],
    ) -> Result<(), DisplayError> {
        self.check(x, y, width, height)?;
        let w = width as usize;
        if buf.len() < w * height as usize {
            return Err(DisplayError::BufferTooSmall);
        }
        if w == 0 {
            return Ok(());
        }

        for (row, out) in (y..y + height).zip(buf.chunks_exact_mut(w)) {
            let start = self.index(x, row);
            out.copy_from_slice(&self.pixels[start..start + w]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_size() {
        let mut memory = [0u16; 10];
        assert!(matches!(
            Framebuffer::new(&mut memory, 4, 4),
            Err(DisplayError::BufferTooSmall)
        ));
    }

    #[test]
    fn test_fill_and_fill_rect() {
        let mut memory = [0u16; 16];
        let mut fb = Framebuffer::new(&mut memory, 4, 4).unwrap();

        fb.fill(0x1111).unwrap();
        fb.fill_rect(1, 1, 2, 2, 0xF800).unwrap();

        assert_eq!(fb.pixel(0, 0), Some(0x1111));
        assert_eq!(fb.pixel(1, 1), Some(0xF800));
        assert_eq!(fb.pixel(2, 2), Some(0xF800));
        assert_eq!(fb.pixel(3, 2), Some(0x1111));
        assert_eq!(fb.pixel(4, 0), None);
    }

    #[test]
    fn test_window_wraps() {
        let mut memory = [0u16; 16];
        let mut fb = Framebuffer::new(&mut memory, 4, 4).unwrap();

        fb.set_window(1, 2, 2, 1).unwrap();
        fb.push_pixels(&[1, 2, 3]).unwrap();

        assert_eq!(fb.pixel(1, 2), Some(3));
        assert_eq!(fb.pixel(2, 2), Some(2));
    }

    #[test]
    fn test_read_rect() {
        let mut memory: [u16; 16] = core::array::from_fn(|i| i as u16);
        let mut fb = Framebuffer::new(&mut memory, 4, 4).unwrap();

        let mut buf = [0u16; 4];
        fb.read_rect(2, 1, 2, 2, &mut buf).unwrap();
        assert_eq!(buf, [6, 7, 10, 11]);

        assert_eq!(
            fb.read_rect(0, 0, 2, 2, &mut buf[..3]),
            Err(DisplayError::BufferTooSmall)
        );
    }

    #[test]
    fn test_rejects_offscreen() {
        let mut memory = [0u16; 16];
        let mut fb = Framebuffer::new(&mut memory, 4, 4).unwrap();

        assert_eq!(fb.fill_rect(3, 0, 2, 1, 0), Err(DisplayError::InvalidCoordinates));
        assert_eq!(fb.set_window(0, 4, 1, 1), Err(DisplayError::InvalidCoordinates));
    }
}
