//! Byte receiver: thin owner of the serial line.
//!
//! Starts one interrupt-driven read per attempt and remembers which attempt
//! it belongs to, so the timeout path knows whether there is anything left
//! to cancel.

use crate::config::UartConfig;
use crate::error::{IoError, LineFault};
use crate::hal::SerialLine;
use crate::state::Ticket;

pub struct ByteReceiver<L> {
    line: L,
    pending: Option<Ticket>,
}

impl<L: SerialLine> ByteReceiver<L> {
    pub fn new(line: L) -> Self {
        Self { line, pending: None }
    }

    pub fn configure(&mut self, config: &UartConfig) -> Result<(), IoError> {
        self.line.configure(config)
    }

    /// Begin the one-byte read for `ticket`. Non-blocking.
    #[inline]
    pub fn start_read(&mut self, ticket: Ticket) -> Result<(), LineFault> {
        self.line.start_read(ticket)?;
        self.pending = Some(ticket);
        Ok(())
    }

    /// Abort the pending read so a late byte cannot land after the attempt
    /// has been reported.
    #[inline]
    pub fn cancel_read(&mut self) {
        if self.pending.take().is_some() {
            self.line.cancel_read();
        }
    }

    /// Forget the pending read once its completion has been observed.
    #[inline]
    pub fn finish_read(&mut self) {
        self.pending = None;
    }

    /// Fire-and-forget transmit. The driver's fault code is returned as-is.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<(), LineFault> {
        self.line.write_byte(byte)
    }

    pub fn into_inner(self) -> L {
        self.line
    }
}
