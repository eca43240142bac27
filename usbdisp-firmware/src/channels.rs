//! Inter-task communication channels
//!
//! The USB endpoint tasks and the engine task only meet here.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;

use usbdisp_protocol::{MAX_PACKET_SIZE, STATUS_PACKET_LEN};

/// One bulk OUT packet as received from the host
pub type Packet = Vec<u8, MAX_PACKET_SIZE>;

/// One interrupt IN status report
pub type StatusReport = [u8; STATUS_PACKET_LEN];

/// Bulk OUT packets waiting for the engine
///
/// When full, the OUT endpoint is not read and the host is NAKed.
const BULK_RX_DEPTH: usize = 4;

/// Status reports waiting for the interrupt IN endpoint
const STATUS_TX_DEPTH: usize = 4;

/// Bulk OUT packets, USB task → engine
pub static BULK_RX: Channel<CriticalSectionRawMutex, Packet, BULK_RX_DEPTH> = Channel::new();

/// Status reports, engine → USB task
pub static STATUS_TX: Channel<CriticalSectionRawMutex, StatusReport, STATUS_TX_DEPTH> =
    Channel::new();

/// Raised after every packet pushed into [`BULK_RX`]
pub static PACKET_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();
