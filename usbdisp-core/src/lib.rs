//! Board-agnostic core of the USB display firmware
//!
//! This crate contains everything between the USB endpoints and the panel
//! that does not depend on a specific chip:
//!
//! - Backpressure ring buffer for bulk OUT bytes
//! - Protocol engine (frame parser, draw handlers, status reporter)
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod ring;

pub use engine::{Activity, Completion, Engine, EngineError, EngineStats};
pub use ring::{RingBuffer, UsbRing, RING_CAPACITY};
