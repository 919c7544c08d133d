//! Global log stream instance.

use crate::logging::LogStream;

/// Log stream for the XMODEM I/O layer.
///
/// Single producer (the context calling `init()`), single consumer (the
/// console drain in the firmware binary).
pub static IO_LOG_STREAM: LogStream = LogStream::new();
