//! Configuration type definitions
//!
//! The firmware embeds these as postcard-serialized binary data produced from
//! `panel.toml` at build time.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use usbdisp_protocol::{MAX_PACKET_SIZE, MIN_PACKET_SIZE};

/// Largest serialized [`DeviceConfig`]
pub const MAX_CONFIG_BYTES: usize = 32;

/// Fastest SPI clock the supported panels accept
pub const MAX_SPI_FREQUENCY_HZ: u32 = 62_500_000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Packet size not a power of two in `MIN_PACKET_SIZE..=MAX_PACKET_SIZE`
    PacketSizeOutOfRange,
    /// Panel width or height is zero
    EmptyPanel,
    /// SPI clock is zero or above the panel limit
    SpiFrequencyOutOfRange,
    /// Binary config could not be decoded
    Deserialize,
    /// Binary config did not fit the output buffer
    Serialize,
}

/// Panel mounting orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Orientation {
    #[default]
    Normal,
    /// Rotated 180°
    Flipped,
}

/// Panel geometry as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PanelConfig {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    pub orientation: Orientation,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            orientation: Orientation::Normal,
        }
    }
}

/// Protocol engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Bulk OUT max packet size advertised to the host
    pub packet_size: u16,
    pub panel: PanelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            packet_size: MAX_PACKET_SIZE as u16,
            panel: PanelConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.packet_size as usize;
        // Full-speed bulk endpoints only allow powers of two
        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size) || !size.is_power_of_two() {
            return Err(ConfigError::PacketSizeOutOfRange);
        }
        if self.panel.width == 0 || self.panel.height == 0 {
            return Err(ConfigError::EmptyPanel);
        }
        Ok(())
    }
}

/// Panel controller bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayHwConfig {
    /// SPI clock in Hz
    pub spi_frequency_hz: u32,
}

impl Default for DisplayHwConfig {
    fn default() -> Self {
        Self {
            spi_frequency_hz: 40_000_000,
        }
    }
}

/// Complete device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    pub engine: EngineConfig,
    pub display: DisplayHwConfig,
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        let hz = self.display.spi_frequency_hz;
        if hz == 0 || hz > MAX_SPI_FREQUENCY_HZ {
            return Err(ConfigError::SpiFrequencyOutOfRange);
        }
        Ok(())
    }

    /// Decode and validate a postcard blob
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize into `buffer`, returning the used prefix
    #[cfg(feature = "serde")]
    pub fn to_slice<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }
}
