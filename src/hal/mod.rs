//! Hardware Abstraction Layer for the XMODEM UART.
//!
//! Narrow traits over the peripherals. Business logic stays in the core
//! modules, HAL is just I/O. Interrupt handlers report back through
//! [`RxCell`](crate::state::RxCell), never through these traits.

#[cfg(target_os = "espidf")]
pub mod esp32;

use crate::config::{AlarmConfig, UartConfig};
use crate::error::{IoError, LineFault};
use crate::state::Ticket;

/// Serial line driver.
///
/// # Safety Invariants
///
/// - Only one owner per UART peripheral instance
/// - At most one read pending at a time
pub trait SerialLine {
    /// Apply line settings.
    fn configure(&mut self, config: &UartConfig) -> Result<(), IoError>;

    /// Begin an interrupt-driven one-byte read and return immediately.
    ///
    /// On completion the driver's ISR must call
    /// `RxCell::on_read_complete(ticket, result)` exactly once, unless the
    /// read is cancelled first.
    fn start_read(&mut self, ticket: Ticket) -> Result<(), LineFault>;

    /// Abort the pending read, if any.
    fn cancel_read(&mut self);

    /// Transmit one byte, blocking until the FIFO accepts it.
    fn write_byte(&mut self, byte: u8) -> Result<(), LineFault>;
}

/// One-shot countdown alarm.
///
/// Applying a config with `enabled == true` (re)starts the countdown; on
/// expiry the driver's ISR calls `RxCell::on_alarm(config.ticket)`. Applying a
/// config with `enabled == false` stops it.
///
/// The ticket handed to `on_alarm` must be the one of the arming that
/// expired. A driver that cannot bind it to the expiry itself must be able to
/// tell an old expiry from the current one.
pub trait AlarmTimer {
    fn configure(&mut self, config: &AlarmConfig) -> Result<(), IoError>;
}

/// Peripherals `init()` brings up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peripheral {
    Uart,
    Rtc,
}

/// Interrupt lines `init()` registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqSource {
    Uart,
    RtcAlarm,
}

/// Board-level setup consumed once by `init()`.
pub trait PlatformSetup {
    fn configure_pin_function(&mut self, pin: u8, function: u8) -> Result<(), IoError>;

    fn enable_input(&mut self, pin: u8) -> Result<(), IoError>;

    fn enable_peripheral_clock(&mut self, peripheral: Peripheral) -> Result<(), IoError>;

    fn register_interrupt(&mut self, source: IrqSource) -> Result<(), IoError>;

    /// Monotonic microseconds, used for log timestamps.
    fn now_us(&self) -> i64;
}
