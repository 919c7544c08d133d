//! Module: config
//!
//! Purpose: Line and pin configuration for the XMODEM UART.
//!
//! Configuration is validated once, before any peripheral is touched.
//! A rejected configuration yields `IoError::InvalidArgument`.

use crate::error::IoError;
use crate::state::Ticket;

/// Receive window in seconds. Fixed at build time.
pub const RX_TIMEOUT_S: u32 = 2;

/// Default XMODEM line speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// UART parity modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// UART stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// UART line configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Data bits per frame (5-8)
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    /// 115200 8N1, no flow control.
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    pub fn validate(&self) -> Result<(), IoError> {
        if self.baud_rate == 0 {
            return Err(IoError::InvalidArgument);
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(IoError::InvalidArgument);
        }
        Ok(())
    }
}

/// Pin assignment for the UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub tx_pin: u8,
    pub rx_pin: u8,
    /// Mux function that routes the pins to the UART.
    pub function: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            tx_pin: 17,
            rx_pin: 16,
            function: 0,
        }
    }
}

impl PinConfig {
    pub fn validate(&self) -> Result<(), IoError> {
        if self.tx_pin == self.rx_pin {
            return Err(IoError::InvalidArgument);
        }
        Ok(())
    }

    /// Whether `pin` is one of the two UART pins.
    #[inline]
    pub fn routes(&self, pin: u8) -> bool {
        pin == self.tx_pin || pin == self.rx_pin
    }
}

/// Complete I/O configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoConfig {
    pub uart: UartConfig,
    pub pins: PinConfig,
}

impl IoConfig {
    /// Check every field. Called by `init()` before any hardware action.
    pub fn validate(&self) -> Result<(), IoError> {
        self.uart.validate()?;
        self.pins.validate()
    }
}

/// One-shot receive alarm.
///
/// Lives for the whole program; only `enabled` and `ticket` change between
/// calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmConfig {
    /// Countdown length in seconds.
    pub timeout_s: u32,
    /// Whether expiry raises the alarm interrupt.
    pub enabled: bool,
    /// Attempt the expiry times out, handed to `RxCell::on_alarm`.
    pub ticket: Ticket,
}

impl AlarmConfig {
    /// Disabled alarm with the fixed receive window.
    pub const fn new() -> Self {
        Self {
            timeout_s: RX_TIMEOUT_S,
            enabled: false,
            ticket: Ticket::from_raw(0),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self::new()
    }
}
