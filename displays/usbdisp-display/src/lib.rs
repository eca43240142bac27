//! RGB565 display sinks for the usbdisp firmware
//!
//! Implementations of [`DisplaySink`](usbdisp_hal::DisplaySink):
//!
//! - [`Framebuffer`]: an in-memory panel, used for host-side tests and
//!   simulation
//! - [`Ili9341`]: SPI TFT controller driven over `embedded-hal` 1.0

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod framebuffer;
pub mod ili9341;

pub use framebuffer::Framebuffer;
pub use ili9341::{Ili9341, Rotation};
