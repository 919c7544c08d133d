//! xmodem-io-uart - Firmware entry point
//!
//! Brings up the XMODEM UART and runs a byte echo loop that NAKs on every
//! receive timeout, which is exactly what an XMODEM receiver does while it
//! waits for a sender. Log lines go out on a separate TX-only UART.
//!
//! ```text
//! UART1 IoConfig::pins (TX / RX)  ◀────▶ XMODEM peer
//! UART2 GPIO6  (TX) ──────────────────▶ USB-UART RX (logs)
//! ```

#![no_std]
#![no_main]

use esp_idf_svc::hal::gpio;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{config::Config, UartDriver, UartTxDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::{self as esp_idf_sys, EspError};
use esp_idf_svc::timer::EspTaskTimerService;

use xmodem_io_uart::hal::esp32::{EspAlarm, EspPlatform, EspSerialLine};
use xmodem_io_uart::{IoConfig, IoError, RxCell, XmodemIo, IO_LOG_STREAM};

/// Shared between the receive loop and both "interrupt" callbacks.
static RX_CELL: RxCell = RxCell::new();

/// XMODEM negative acknowledge; also the receiver's start request.
const NAK: u8 = 0x15;

/// Log UART speed.
const LOG_BAUD_RATE: u32 = 115_200;

/// Log UART TX pin; must stay clear of the XMODEM pins.
const LOG_TX_PIN: u8 = 6;

#[no_mangle]
fn main() {
    // Initialize ESP-IDF
    esp_idf_sys::link_patches();

    if run().is_err() {
        // Nothing left to report to: idle forever.
        loop {
            unsafe {
                esp_idf_sys::vTaskDelay(1000);
            }
        }
    }
}

fn run() -> Result<(), EspError> {
    let peripherals = Peripherals::take()?;
    let config = IoConfig::default();
    let pins = config.pins;
    if pins.validate().is_err() || pins.routes(LOG_TX_PIN) {
        return Ok(());
    }

    let mut log_uart = UartTxDriver::new(
        peripherals.uart2,
        peripherals.pins.gpio6,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &Config::default().baudrate(Hertz(LOG_BAUD_RATE)),
    )?;

    // SAFETY: the two pins are distinct, differ from the log pin, and no
    // other driver in this program claims them.
    let (tx, rx) = unsafe {
        (
            gpio::AnyIOPin::new(pins.tx_pin as i32),
            gpio::AnyIOPin::new(pins.rx_pin as i32),
        )
    };
    let uart = UartDriver::new(
        peripherals.uart1,
        tx,
        rx,
        Option::<gpio::AnyIOPin>::None,
        Option::<gpio::AnyIOPin>::None,
        &Config::default().baudrate(Hertz(config.uart.baud_rate)),
    )?;

    let timers = EspTaskTimerService::new()?;
    let line = EspSerialLine::new(uart, &RX_CELL, &timers)?;
    let alarm = EspAlarm::new(&RX_CELL, &timers)?;

    let mut io = XmodemIo::new(&RX_CELL, line, alarm, config);
    let init = io.init(&mut EspPlatform::new(pins));
    drain_log(&mut log_uart);
    if init.is_err() {
        return Ok(());
    }

    loop {
        match io.recv() {
            Ok(byte) => {
                let _ = io.send_byte(byte);
            }
            Err(IoError::TimedOut) => {
                let _ = io.send_byte(NAK);
            }
            Err(_) => {}
        }
    }
}

/// Write every queued log entry to the log UART.
fn drain_log(uart: &mut UartTxDriver<'_>) {
    let mut line = [0u8; 160];
    while let Some(entry) = IO_LOG_STREAM.drain() {
        let len = entry.format_line(&mut line);
        let _ = uart.write(&line[..len]);
    }
}
