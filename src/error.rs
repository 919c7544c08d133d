//! Error types for the XMODEM UART I/O layer.
//!
//! Every failure is returned to the immediate caller. Nothing here is fatal,
//! nothing is retried: recovery belongs to the protocol layer above.

/// Raw UART fault code, passed through verbatim from the line driver.
///
/// The named constants follow the 16550-style line status bits most UART
/// drivers report. Codes that match none of them are kept as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineFault(u16);

impl LineFault {
    /// Receiver overrun: a byte was lost before it could be read.
    pub const OVERRUN: LineFault = LineFault(0x02);
    /// Parity mismatch.
    pub const PARITY: LineFault = LineFault(0x04);
    /// Missing stop bit.
    pub const FRAMING: LineFault = LineFault(0x08);
    /// Line held low longer than a full frame.
    pub const BREAK: LineFault = LineFault(0x10);

    /// Wrap a raw driver code.
    #[inline]
    pub const fn from_raw(code: u16) -> Self {
        Self(code)
    }

    /// The driver code, unchanged.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_overrun(self) -> bool {
        self.0 & Self::OVERRUN.0 != 0
    }

    #[inline]
    pub const fn is_parity(self) -> bool {
        self.0 & Self::PARITY.0 != 0
    }

    #[inline]
    pub const fn is_framing(self) -> bool {
        self.0 & Self::FRAMING.0 != 0
    }

    #[inline]
    pub const fn is_break(self) -> bool {
        self.0 & Self::BREAK.0 != 0
    }
}

impl core::fmt::Display for LineFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "line fault 0x{:04x}", self.0)
    }
}

/// Errors reported by [`XmodemIo`](crate::io::XmodemIo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// E01: The UART reported a transmission fault.
    LineError(LineFault),
    /// E02: No byte arrived within the receive window.
    TimedOut,
    /// E03: Configuration rejected before touching hardware.
    InvalidArgument,
}

/// `EIO` as returned by newlib and most embedded C runtimes.
pub const EIO: i32 = 5;
/// `EINVAL`.
pub const EINVAL: i32 = 22;
/// `ETIME`.
pub const ETIME: i32 = 62;

impl IoError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::LineError(_) => "E01",
            Self::TimedOut => "E02",
            Self::InvalidArgument => "E03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::LineError(_) => "line error",
            Self::TimedOut => "timed out",
            Self::InvalidArgument => "invalid argument",
        }
    }

    /// Negative errno for callers still speaking the C convention.
    pub fn errno(&self) -> i32 {
        match self {
            Self::LineError(_) => -EIO,
            Self::TimedOut => -ETIME,
            Self::InvalidArgument => -EINVAL,
        }
    }

    /// The hardware fault code, if this is a line error.
    pub fn line_fault(&self) -> Option<LineFault> {
        match self {
            Self::LineError(fault) => Some(*fault),
            _ => None,
        }
    }
}

impl From<LineFault> for IoError {
    fn from(fault: LineFault) -> Self {
        IoError::LineError(fault)
    }
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LineError(fault) => write!(f, "{}: {} ({})", self.code(), self.message(), fault),
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}
