//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod engine;
pub mod usb;

pub use engine::engine_task;
pub use usb::{bulk_rx_task, status_tx_task, usb_device_task};
