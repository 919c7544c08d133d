//! # xmodem-io-uart
//!
//! Timeout-bounded single-byte UART receive for XMODEM transfers on bare
//! metal.
//!
//! ## Architecture
//!
//! Two interrupt sources, one shared cell:
//! - The UART ISR reports a byte or a line fault
//! - The alarm ISR reports expiry of the 2 s receive window
//! - Whichever resolves [`RxCell`] first wins, the other is dropped
//! - [`XmodemIo`] spins on the cell, then cleans up and reports
//!
//! No allocation, no locks, no scheduler.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod hal;
pub mod io;
pub mod log_globals;
pub mod logging;
pub mod receiver;
pub mod state;
pub mod stats;
pub mod timeout;

pub use config::{AlarmConfig, IoConfig, PinConfig, UartConfig, RX_TIMEOUT_S};
pub use error::{IoError, LineFault};
pub use hal::{AlarmTimer, IrqSource, Peripheral, PlatformSetup, SerialLine};
pub use io::XmodemIo;
pub use log_globals::IO_LOG_STREAM;
pub use state::{RxCell, RxOutcome, Ticket};
pub use stats::StatsSnapshot;
