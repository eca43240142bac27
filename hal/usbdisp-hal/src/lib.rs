//! usbdisp Hardware Abstraction Layer
//!
//! This crate defines the two hardware boundaries of the display protocol
//! engine. Board crates implement them; the engine in `usbdisp-core` is
//! generic over both.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  usbdisp-core (protocol engine)         │
//! └─────────────────────────────────────────┘
//!           │                     │
//!           ▼                     ▼
//! ┌───────────────────┐ ┌───────────────────┐
//! │ transport::       │ │ display::         │
//! │   Transport       │ │   DisplaySink     │
//! └───────────────────┘ └───────────────────┘
//!           │                     │
//!           ▼                     ▼
//! ┌───────────────────┐ ┌───────────────────┐
//! │ USB function      │ │ Ili9341 /         │
//! │ (firmware)        │ │ Framebuffer       │
//! └───────────────────┘ └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`transport::Transport`] - Non-blocking bulk-OUT / interrupt-IN access
//! - [`display::DisplaySink`] - RGB565 panel primitives

#![no_std]
#![deny(unsafe_code)]

pub mod display;
pub mod transport;

// Re-export key traits at crate root for convenience
pub use display::{DisplayError, DisplaySink};
pub use transport::{Endpoint, Transport};
