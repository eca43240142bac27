//! ILI9341 TFT controller over SPI
//!
//! 4-wire SPI: a data/command line selects whether bytes are a command or
//! its parameters. The controller is run in 16-bit RGB565 mode for writes;
//! reads come back as 18-bit RGB666, three bytes per pixel after one dummy
//! byte. Pixel data is sent big-endian.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use usbdisp_hal::{DisplayError, DisplaySink};
use usbdisp_protocol::color::from_rgb666;

/// ILI9341 commands
#[allow(dead_code)]
mod cmd {
    pub const NOP: u8 = 0x00;
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const PASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const RAMRD: u8 = 0x2E;
    pub const MADCTL: u8 = 0x36;
    pub const PIXFMT: u8 = 0x3A;
}

/// MADCTL values (landscape, BGR panel)
const MADCTL_LANDSCAPE: u8 = 0x28;
const MADCTL_LANDSCAPE_FLIPPED: u8 = 0xE8;

/// 16 bits per pixel for both interfaces
const PIXFMT_RGB565: u8 = 0x55;

/// Pixels sent per SPI write
const CHUNK_PIXELS: usize = 32;

/// Panel rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    #[default]
    Landscape,
    /// Landscape rotated 180°
    LandscapeFlipped,
}

impl Rotation {
    fn madctl(self) -> u8 {
        match self {
            Rotation::Landscape => MADCTL_LANDSCAPE,
            Rotation::LandscapeFlipped => MADCTL_LANDSCAPE_FLIPPED,
        }
    }
}

/// ILI9341 driver
pub struct Ili9341<SPI, DC, CS, DELAY> {
    spi: SPI,
    dc: DC,
    cs: CS,
    delay: DELAY,
    width: u16,
    height: u16,
    rotation: Rotation,
    initialized: bool,
}

impl<SPI, DC, CS, DELAY> Ili9341<SPI, DC, CS, DELAY>
where
    SPI: SpiBus,
    DC: OutputPin,
    CS: OutputPin,
    DELAY: DelayNs,
{
    /// Create a driver for a `width × height` panel
    pub fn new(
        spi: SPI,
        dc: DC,
        cs: CS,
        delay: DELAY,
        width: u16,
        height: u16,
        rotation: Rotation,
    ) -> Self {
        Self {
            spi,
            dc,
            cs,
            delay,
            width,
            height,
            rotation,
            initialized: false,
        }
    }

    /// Reset the controller and switch the panel on
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.command(cmd::SWRESET, &[])?;
        self.delay.delay_ms(120);

        self.command(cmd::SLPOUT, &[])?;
        self.delay.delay_ms(120);

        self.command(cmd::PIXFMT, &[PIXFMT_RGB565])?;
        self.command(cmd::MADCTL, &[self.rotation.madctl()])?;
        self.command(cmd::DISPON, &[])?;
        self.deselect()?;

        self.initialized = true;
        Ok(())
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Release the bus and pins
    pub fn release(self) -> (SPI, DC, CS, DELAY) {
        (self.spi, self.dc, self.cs, self.delay)
    }

    fn ensure_init(&self) -> Result<(), DisplayError> {
        if self.initialized {
            Ok(())
        } else {
            Err(DisplayError::NotInitialized)
        }
    }

    fn check(&self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
        if width == 0
            || height == 0
            || x as u32 + width as u32 > self.width as u32
            || y as u32 + height as u32 > self.height as u32
        {
            return Err(DisplayError::InvalidCoordinates);
        }
        Ok(())
    }

    /// Send a command byte followed by its parameters, leaving CS asserted
    fn command(&mut self, command: u8, params: &[u8]) -> Result<(), DisplayError> {
        self.cs.set_low().map_err(|_| DisplayError::Communication)?;
        self.dc.set_low().map_err(|_| DisplayError::Communication)?;
        self.write(&[command])?;
        self.dc.set_high().map_err(|_| DisplayError::Communication)?;
        if !params.is_empty() {
            self.write(params)?;
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.spi.write(bytes).map_err(|_| DisplayError::Communication)?;
        self.spi.flush().map_err(|_| DisplayError::Communication)
    }

    fn deselect(&mut self) -> Result<(), DisplayError> {
        self.cs.set_high().map_err(|_| DisplayError::Communication)
    }

    /// Set the column/page address window
    fn address(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
        let [x0h, x0l] = x.to_be_bytes();
        let [x1h, x1l] = (x + width - 1).to_be_bytes();
        let [y0h, y0l] = y.to_be_bytes();
        let [y1h, y1l] = (y + height - 1).to_be_bytes();

        self.command(cmd::CASET, &[x0h, x0l, x1h, x1l])?;
        self.command(cmd::PASET, &[y0h, y0l, y1h, y1l])
    }
}

impl<SPI, DC, CS, DELAY> DisplaySink for Ili9341<SPI, DC, CS, DELAY>
where
    SPI: SpiBus,
    DC: OutputPin,
    CS: OutputPin,
    DELAY: DelayNs,
{
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
        self.ensure_init()?;
        self.check(x, y, width, height)?;

        self.address(x, y, width, height)?;
        self.command(cmd::RAMWR, &[])?;

        let mut chunk = [0u8; CHUNK_PIXELS * 2];
        for pair in chunk.chunks_exact_mut(2) {
            pair.copy_from_slice(&color.to_be_bytes());
        }

        let mut remaining = width as usize * height as usize;
        while remaining > 0 {
            let n = remaining.min(CHUNK_PIXELS);
            self.write(&chunk[..n * 2])?;
            remaining -= n;
        }

        self.deselect()
    }

    fn set_window(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
        self.ensure_init()?;
        self.check(x, y, width, height)?;

        self.address(x, y, width, height)?;
        // Memory write stays open for push_pixels
        self.command(cmd::RAMWR, &[])
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<(), DisplayError> {
        self.ensure_init()?;

        let mut chunk = [0u8; CHUNK_PIXELS * 2];
        for group in pixels.chunks(CHUNK_PIXELS) {
            for (bytes, pixel) in chunk.chunks_exact_mut(2).zip(group) {
                bytes.copy_from_slice(&pixel.to_be_bytes());
            }
            self.write(&chunk[..group.len() * 2])?;
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
        self.ensure_init()?;
        self.check(x, y, width, height)?;

        let count = width as usize * height as usize;
        if buf.len() < count {
            return Err(DisplayError::BufferTooSmall);
        }

        self.address(x, y, width, height)?;
        self.command(cmd::RAMRD, &[])?;

        let mut dummy = [0u8; 1];
        self.spi.read(&mut dummy).map_err(|_| DisplayError::Communication)?;

        let mut raw = [0u8; CHUNK_PIXELS * 3];
        for group in buf[..count].chunks_mut(CHUNK_PIXELS) {
            let bytes = &mut raw[..group.len() * 3];
            self.spi.read(bytes).map_err(|_| DisplayError::Communication)?;
            for (pixel, rgb) in group.iter_mut().zip(bytes.chunks_exact(3)) {
                *pixel = from_rgb666(rgb[0], rgb[1], rgb[2]);
            }
        }
        self.spi.flush().map_err(|_| DisplayError::Communication)?;

        self.deselect()
    }
}
