//! XMODEM byte I/O over an interrupt-driven UART.
//!
//! # Receive sequence
//!
//! ```text
//! receive_byte()
//!   │ reset RxCell ──▶ Waiting, ticket
//!   │ arm alarm (2 s, ticket)
//!   │ start one-byte read (ticket)
//!   │
//!   │ spin on RxCell::poll()      ◀── UART ISR:  ByteReady / LineError
//!   │                             ◀── Alarm ISR: TimedOut
//!   │
//!   │ TimedOut? cancel read
//!   │ disarm alarm
//!   ▼ ByteReady → Ok(byte), LineError → Err(code), TimedOut → Err(TimedOut)
//! ```
//!
//! # Rules
//!
//! - The spin loop is the only blocking point; only interrupts preempt it.
//! - Both interrupts carry the attempt's ticket; leftovers from an earlier
//!   attempt are dropped by the cell.
//! - The alarm is disarmed on every exit path.
//! - No retries here: the protocol layer calls again if it wants to.
//! - The receive path never logs.

use crate::config::{IoConfig, RX_TIMEOUT_S};
use crate::error::IoError;
use crate::hal::{AlarmTimer, IrqSource, Peripheral, PlatformSetup, SerialLine};
use crate::log_globals::IO_LOG_STREAM;
use crate::logging::LogStream;
use crate::receiver::ByteReceiver;
use crate::state::{RxCell, RxOutcome};
use crate::stats::{RxStats, StatsSnapshot};
use crate::timeout::RxTimeout;

/// Single-byte XMODEM transport.
///
/// Owns the UART and alarm drivers; `&mut self` on every operation keeps
/// attempts strictly sequential.
///
/// # Example
///
/// ```ignore
/// static RX: RxCell = RxCell::new();
///
/// let mut io = XmodemIo::new(&RX, line, alarm, IoConfig::default());
/// io.init(&mut board)?;
///
/// let mut byte = 0u8;
/// match io.receive_byte(&mut byte) {
///     Ok(()) => handle(byte),
///     Err(IoError::TimedOut) => io.send_byte(NAK)?,
///     Err(e) => return Err(e),
/// }
/// ```
pub struct XmodemIo<'a, L, A> {
    cell: &'a RxCell,
    receiver: ByteReceiver<L>,
    timeout: RxTimeout<A>,
    config: IoConfig,
    stats: RxStats,
    log: &'a LogStream,
}

impl<'a, L: SerialLine, A: AlarmTimer> XmodemIo<'a, L, A> {
    /// Bind the drivers to the shared receive cell their ISRs report to.
    ///
    /// Nothing touches the hardware until [`init`](Self::init).
    pub fn new(cell: &'a RxCell, line: L, alarm: A, config: IoConfig) -> Self {
        Self {
            cell,
            receiver: ByteReceiver::new(line),
            timeout: RxTimeout::new(alarm),
            config,
            stats: RxStats::new(),
            log: &IO_LOG_STREAM,
        }
    }

    /// Log to `log` instead of the global [`IO_LOG_STREAM`].
    pub fn with_log(mut self, log: &'a LogStream) -> Self {
        self.log = log;
        self
    }

    /// One-time peripheral bring-up: pin mux, clocks, line settings,
    /// interrupt registration, alarm (disabled).
    ///
    /// The configuration is validated first; an invalid one returns
    /// `IoError::InvalidArgument` with no hardware touched.
    pub fn init<P: PlatformSetup>(&mut self, platform: &mut P) -> Result<(), IoError> {
        self.config.validate()?;

        let pins = self.config.pins;
        platform.configure_pin_function(pins.tx_pin, pins.function)?;
        platform.configure_pin_function(pins.rx_pin, pins.function)?;
        platform.enable_input(pins.rx_pin)?;

        platform.enable_peripheral_clock(Peripheral::Uart)?;
        platform.enable_peripheral_clock(Peripheral::Rtc)?;

        self.receiver.configure(&self.config.uart)?;
        platform.register_interrupt(IrqSource::Uart)?;

        platform.register_interrupt(IrqSource::RtcAlarm)?;
        self.timeout.configure()?;

        crate::rt_info!(
            self.log,
            platform.now_us(),
            "xmodem uart: {} baud, tx={} rx={}, rx timeout {}s",
            self.config.uart.baud_rate,
            pins.tx_pin,
            pins.rx_pin,
            RX_TIMEOUT_S
        );
        Ok(())
    }

    /// Transmit one byte. No timeout, no acknowledgement.
    pub fn send_byte(&mut self, byte: u8) -> Result<(), IoError> {
        match self.receiver.write_byte(byte) {
            Ok(()) => {
                self.stats.record_sent();
                Ok(())
            }
            Err(fault) => {
                self.stats.record_send_error();
                Err(IoError::LineError(fault))
            }
        }
    }

    /// Receive exactly one byte into `out`, or report why not.
    ///
    /// `out` is written only when a byte arrived. Blocks for at most the
    /// alarm window. A line error or timeout takes precedence over a failure
    /// to disarm the alarm; after a good byte the disarm failure is returned.
    pub fn receive_byte(&mut self, out: &mut u8) -> Result<(), IoError> {
        let ticket = self.cell.reset();
        if let Err(e) = self.timeout.arm(ticket) {
            self.cell.release();
            let _ = self.timeout.disarm();
            return Err(e);
        }

        if let Err(fault) = self.receiver.start_read(ticket) {
            self.cell.release();
            let _ = self.timeout.disarm();
            self.stats.record_line_error();
            return Err(IoError::LineError(fault));
        }

        let outcome = self.wait();

        if outcome == RxOutcome::TimedOut {
            self.receiver.cancel_read();
        } else {
            self.receiver.finish_read();
        }

        let disarmed = self.timeout.disarm();
        self.cell.release();

        match outcome {
            RxOutcome::ByteReady(byte) => {
                *out = byte;
                self.stats.record_received();
                disarmed
            }
            RxOutcome::LineError(fault) => {
                self.stats.record_line_error();
                Err(IoError::LineError(fault))
            }
            _ => {
                self.stats.record_timeout();
                Err(IoError::TimedOut)
            }
        }
    }

    /// [`receive_byte`](Self::receive_byte) returning the byte by value.
    pub fn recv(&mut self) -> Result<u8, IoError> {
        let mut byte = 0u8;
        self.receive_byte(&mut byte)?;
        Ok(byte)
    }

    /// Spin until an ISR resolves the attempt.
    #[inline]
    fn wait(&self) -> RxOutcome {
        loop {
            let outcome = self.cell.poll();
            if outcome.is_terminal() {
                return outcome;
            }
            core::hint::spin_loop();
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &IoConfig {
        &self.config
    }

    /// Whether the receive alarm is currently enabled.
    pub fn is_timeout_armed(&self) -> bool {
        self.timeout.is_armed()
    }

    /// Hand the drivers back.
    pub fn into_parts(self) -> (L, A) {
        (self.receiver.into_inner(), self.timeout.into_inner())
    }
}
