//! Panel configuration
//!
//! `build.rs` turns panel.toml into a postcard blob; it is decoded and
//! validated again at boot.

use defmt::*;

use usbdisp_core::config::{DeviceConfig, Orientation};
use usbdisp_display::Rotation;

/// panel.toml as encoded by build.rs
const EMBEDDED_CONFIG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/panel.bin"));

/// Load the embedded configuration, falling back to defaults
pub fn load() -> DeviceConfig {
    match DeviceConfig::from_bytes(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!(
                "Panel {}x{}, {:?}, {}-byte packets, SPI {} Hz",
                config.engine.panel.width,
                config.engine.panel.height,
                config.engine.panel.orientation,
                config.engine.packet_size,
                config.display.spi_frequency_hz
            );
            config
        }
        Err(e) => {
            warn!("Embedded config rejected ({:?}), using defaults", e);
            DeviceConfig::default()
        }
    }
}

/// Controller scan direction for a mounting orientation
pub fn rotation(orientation: Orientation) -> Rotation {
    match orientation {
        Orientation::Normal => Rotation::Landscape,
        Orientation::Flipped => Rotation::LandscapeFlipped,
    }
}
