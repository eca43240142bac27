//! Display sink trait
//!
//! Defines the primitives the protocol engine needs from an RGB565 panel.
//! Pixels are raw RGB565 values (5 bits red, 6 green, 5 blue).

/// Display sink errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with the panel controller
    Communication,
    /// Rectangle lies outside the panel
    InvalidCoordinates,
    /// Display not initialized
    NotInitialized,
    /// Read-back buffer too small for the requested rectangle
    BufferTooSmall,
}

/// RGB565 panel primitives
///
/// Coordinates are in pixels with the origin at the top-left corner.
/// Rectangles are given as origin plus size. Implementations may assume the
/// engine has already checked that rectangles fit inside [`size`](Self::size).
pub trait DisplaySink {
    /// Panel size as (width, height) in pixels
    fn size(&self) -> (u16, u16);

    /// Fill the entire panel with one color
    fn fill(&mut self, color: u16) -> Result<(), DisplayError> {
        let (width, height) = self.size();
        self.fill_rect(0, 0, width, height, color)
    }

    /// Fill a rectangle with one color
    fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: u16,
    ) -> Result<(), DisplayError>;

    /// Open an addressing window for [`push_pixels`](Self::push_pixels)
    ///
    /// Pixels pushed afterwards fill the window row-major, starting at its
    /// top-left corner.
    fn set_window(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError>;

    /// Stream pixels into the current window
    fn push_pixels(&mut self, pixels: &[u16]) -> Result<(), DisplayError>;

    /// Read back a rectangle of panel pixels, row-major
    ///
    /// `buf` must hold at least `width * height` pixels.
    fn read_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        buf: &mut [u16],
    ) -> Result<(), DisplayError>;
}

impl<D: DisplaySink + ?Sized> DisplaySink for &mut D {
    fn size(&self) -> (u16, u16) {
        (**self).size()
    }

    fn fill(&mut self, color: u16) -> Result<(), DisplayError> {
        (**self).fill(color)
    }

    fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: u16,
    ) -> Result<(), DisplayError> {
        (**self).fill_rect(x, y, width, height, color)
    }

    fn set_window(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
        (**self).set_window(x, y, width, height)
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<(), DisplayError> {
        (**self).push_pixels(pixels)
    }

    fn read_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        buf: &mut [u16],
    ) -> Result<(), DisplayError> {
        (**self).read_rect(x, y, width, height, buf)
    }
}
