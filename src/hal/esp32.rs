//! ESP-IDF backend.
//!
//! UART via `UartDriver`, receive window via a one-shot `esp_timer`.
//! The RX-complete interrupt is played by a 1 ms `esp_timer` callback that
//! pulls at most one byte out of the driver's RX ring while a read is
//! pending.
//!
//! `esp_timer` callbacks are dispatched from the timer task, so `cancel()`
//! can lose against an expiry that is already queued. Both callbacks
//! therefore check which attempt they belong to before touching the cell.

extern crate alloc;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use esp_idf_svc::hal::uart::{config, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::{self, uart_port_t, EspError};
use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};

use crate::config::{AlarmConfig, Parity, PinConfig, StopBits, UartConfig};
use crate::error::{IoError, LineFault};
use crate::hal::{AlarmTimer, IrqSource, Peripheral, PlatformSetup, SerialLine};
use crate::state::{RxCell, Ticket};

/// RX poll period; bounds receive latency.
const RX_POLL_PERIOD: Duration = Duration::from_millis(1);

/// `pending` value when no read is outstanding. Above any 16-bit ticket.
const NO_READ: u32 = u32::MAX;

fn fault_from(err: EspError) -> LineFault {
    LineFault::from_raw(err.code() as u16)
}

/// UART line backed by an installed ESP-IDF UART driver.
pub struct EspSerialLine {
    uart: UartDriver<'static>,
    pending: Arc<AtomicU32>,
    _poller: EspTimer<'static>,
}

impl EspSerialLine {
    /// Take over an installed driver and start the RX poller.
    ///
    /// Completions are reported to `cell`.
    pub fn new(
        uart: UartDriver<'static>,
        cell: &'static RxCell,
        timers: &EspTaskTimerService,
    ) -> Result<Self, EspError> {
        let port = uart.port();
        let pending = Arc::new(AtomicU32::new(NO_READ));

        let poller = {
            let pending = Arc::clone(&pending);
            timers.timer(move || poll_rx(port, &pending, cell))?
        };
        poller.every(RX_POLL_PERIOD)?;

        Ok(Self {
            uart,
            pending,
            _poller: poller,
        })
    }
}

/// RX "interrupt": complete the pending read if a byte or an error is there.
fn poll_rx(port: uart_port_t, pending: &AtomicU32, cell: &RxCell) {
    let raw = pending.load(Ordering::Acquire);
    if raw == NO_READ {
        return;
    }

    let mut byte = 0u8;
    // SAFETY: driver installed for `port` for as long as the poller lives;
    // one-byte buffer on our stack.
    let n = unsafe { sys::uart_read_bytes(port, (&mut byte as *mut u8).cast(), 1, 0) };
    let result = match n {
        0 => return,
        1 => Ok(byte),
        _ => Err(LineFault::from_raw(n as u16)),
    };

    // Claim the read so it completes exactly once, even against cancel_read().
    if pending
        .compare_exchange(raw, NO_READ, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        cell.on_read_complete(Ticket::from_raw(raw as u16), result);
    }
}

impl SerialLine for EspSerialLine {
    fn configure(&mut self, config: &UartConfig) -> Result<(), IoError> {
        let data_bits = match config.data_bits {
            5 => config::DataBits::DataBits5,
            6 => config::DataBits::DataBits6,
            7 => config::DataBits::DataBits7,
            8 => config::DataBits::DataBits8,
            _ => return Err(IoError::InvalidArgument),
        };
        let parity = match config.parity {
            Parity::None => config::Parity::ParityNone,
            Parity::Even => config::Parity::ParityEven,
            Parity::Odd => config::Parity::ParityOdd,
        };
        let stop_bits = match config.stop_bits {
            StopBits::One => config::StopBits::STOP1,
            StopBits::Two => config::StopBits::STOP2,
        };

        self.uart
            .change_baudrate(Hertz(config.baud_rate))
            .map_err(|e| IoError::LineError(fault_from(e)))?;
        self.uart
            .change_data_bits(data_bits)
            .map_err(|e| IoError::LineError(fault_from(e)))?;
        self.uart
            .change_parity(parity)
            .map_err(|e| IoError::LineError(fault_from(e)))?;
        self.uart
            .change_stop_bits(stop_bits)
            .map_err(|e| IoError::LineError(fault_from(e)))?;
        Ok(())
    }

    fn start_read(&mut self, ticket: Ticket) -> Result<(), LineFault> {
        self.pending.store(ticket.raw() as u32, Ordering::Release);
        Ok(())
    }

    fn cancel_read(&mut self) {
        self.pending.store(NO_READ, Ordering::Release);
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), LineFault> {
        self.uart.write(&[byte]).map(|_| ()).map_err(fault_from)
    }
}

fn now_ms() -> u32 {
    // SAFETY: esp_timer_get_time is always safe to call
    (unsafe { sys::esp_timer_get_time() } / 1000) as u32
}

/// Arming shared between `EspAlarm` and its expiry callback.
struct Arming {
    ticket: AtomicU32,
    deadline_ms: AtomicU32,
}

/// Receive window alarm on a one-shot `esp_timer`.
///
/// The callback cannot carry a per-arming argument, so it reads the current
/// ticket and only fires once that arming's deadline has passed. An expiry
/// of an earlier arming that runs late sees the later deadline and returns.
pub struct EspAlarm {
    timer: EspTimer<'static>,
    arming: Arc<Arming>,
}

impl EspAlarm {
    pub fn new(cell: &'static RxCell, timers: &EspTaskTimerService) -> Result<Self, EspError> {
        let arming = Arc::new(Arming {
            ticket: AtomicU32::new(0),
            deadline_ms: AtomicU32::new(0),
        });
        let timer = {
            let arming = Arc::clone(&arming);
            timers.timer(move || {
                let ticket = arming.ticket.load(Ordering::Acquire);
                let deadline = arming.deadline_ms.load(Ordering::Relaxed);
                if (now_ms().wrapping_sub(deadline) as i32) < 0 {
                    return;
                }
                cell.on_alarm(Ticket::from_raw(ticket as u16));
            })?
        };
        Ok(Self { timer, arming })
    }
}

impl AlarmTimer for EspAlarm {
    fn configure(&mut self, config: &AlarmConfig) -> Result<(), IoError> {
        self.timer.cancel().map_err(|_| IoError::InvalidArgument)?;
        if config.enabled {
            let window = Duration::from_secs(config.timeout_s as u64);
            self.arming.deadline_ms.store(
                now_ms().wrapping_add(window.as_millis() as u32),
                Ordering::Relaxed,
            );
            self.arming
                .ticket
                .store(config.ticket.raw() as u32, Ordering::Release);
            self.timer
                .after(window)
                .map_err(|_| IoError::InvalidArgument)?;
        }
        Ok(())
    }
}

/// Board setup on ESP-IDF.
///
/// The GPIO matrix routing, UART clock and UART interrupt are all handled by
/// `UartDriver::new`, and `esp_timer` owns its own interrupt. What is left is
/// checking that the configured pins are the ones the driver was built on,
/// and the RX pull-up.
pub struct EspPlatform {
    driver_pins: PinConfig,
}

impl EspPlatform {
    /// `driver_pins` are the pins the `UartDriver` was created with.
    pub fn new(driver_pins: PinConfig) -> Self {
        Self { driver_pins }
    }
}

impl PlatformSetup for EspPlatform {
    fn configure_pin_function(&mut self, pin: u8, _function: u8) -> Result<(), IoError> {
        if !self.driver_pins.routes(pin) {
            return Err(IoError::InvalidArgument);
        }
        Ok(())
    }

    fn enable_input(&mut self, pin: u8) -> Result<(), IoError> {
        if pin != self.driver_pins.rx_pin {
            return Err(IoError::InvalidArgument);
        }
        // SAFETY: plain register write on a pin the UART driver owns.
        sys::esp!(unsafe { sys::gpio_pullup_en(pin as i32) }).map_err(|_| IoError::InvalidArgument)
    }

    fn enable_peripheral_clock(&mut self, _peripheral: Peripheral) -> Result<(), IoError> {
        Ok(())
    }

    fn register_interrupt(&mut self, _source: IrqSource) -> Result<(), IoError> {
        Ok(())
    }

    fn now_us(&self) -> i64 {
        // SAFETY: esp_timer_get_time is always safe to call
        unsafe { sys::esp_timer_get_time() }
    }
}
