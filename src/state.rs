//! Shared receive state for one in-flight byte read.
//!
//! # Architecture
//!
//! ```text
//! UART ISR ──on_read_complete()──┐
//!                                ▼
//!                             RxCell ◀──poll()── receive_byte() spin loop
//!                                ▲
//! Alarm ISR ────on_alarm()───────┘
//! ```
//!
//! The whole outcome lives in one `AtomicU32`:
//!
//! ```text
//!  31                  16 15          8 7           0
//! ┌──────────────────────┬─────────────┬─────────────┐
//! │ generation           │ byte        │ tag         │
//! │ attempt no.          │ ByteReady   │ Idle..      │
//! └──────────────────────┴─────────────┴─────────────┘
//! ```
//!
//! A line fault code is 16 bits wide and does not fit next to the generation,
//! so it goes through a side slot: the winning writer first claims the
//! attempt (`Latching`), stores the code, then publishes `LineError` with a
//! release store. `Latching` is not terminal, so the caller keeps spinning
//! for the few instructions it takes, and every other writer already sees a
//! resolved attempt.
//!
//! # Rules
//!
//! - Only `reset()` enters `Waiting`, and only when nothing is in flight.
//! - Terminal states are reached by compare-and-set from `Waiting` of the
//!   same generation. First writer wins, every later write is dropped.
//! - Both interrupt sources carry the [`Ticket`] of their attempt, so a byte
//!   or an expiry left over from an earlier attempt cannot resolve a later one.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use crate::error::LineFault;

const TAG_IDLE: u32 = 0;
const TAG_WAITING: u32 = 1;
const TAG_BYTE_READY: u32 = 2;
const TAG_LINE_ERROR: u32 = 3;
const TAG_TIMED_OUT: u32 = 4;
const TAG_LATCHING: u32 = 5;

#[inline]
const fn pack(tag: u32, generation: u16, byte: u8) -> u32 {
    tag | (byte as u32) << 8 | (generation as u32) << 16
}

#[inline]
const fn tag_of(word: u32) -> u32 {
    word & 0xFF
}

#[inline]
const fn byte_of(word: u32) -> u8 {
    (word >> 8) as u8
}

#[inline]
const fn generation_of(word: u32) -> u16 {
    (word >> 16) as u16
}

/// Outcome of the current (or last) receive attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxOutcome {
    /// No attempt started, or the last one has been consumed.
    Idle,
    /// Attempt in flight.
    Waiting,
    /// The line delivered a byte.
    ByteReady(u8),
    /// The UART reported a fault.
    LineError(LineFault),
    /// The alarm fired before any byte arrived.
    TimedOut,
}

impl RxOutcome {
    /// True for `ByteReady`, `LineError` and `TimedOut`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RxOutcome::ByteReady(_) | RxOutcome::LineError(_) | RxOutcome::TimedOut
        )
    }
}

/// Identifies one receive attempt.
///
/// Handed out by [`RxCell::reset`] and passed to the line driver and the
/// alarm so that their interrupts can prove which attempt they belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    generation: u16,
}

impl Ticket {
    /// Attempt number (wraps at 65536).
    #[inline]
    pub fn generation(&self) -> u16 {
        self.generation
    }

    /// For drivers that park the ticket in an atomic between start and ISR.
    #[inline]
    pub const fn from_raw(generation: u16) -> Self {
        Self { generation }
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.generation
    }
}

/// Interrupt-safe single-slot receive state.
///
/// # Usage
///
/// ```ignore
/// static RX: RxCell = RxCell::new();
///
/// // In UART ISR:
/// RX.on_read_complete(ticket, Ok(byte));
///
/// // In alarm ISR:
/// RX.on_alarm(ticket);
///
/// // In the caller:
/// let ticket = RX.reset();
/// while !RX.poll().is_terminal() {
///     core::hint::spin_loop();
/// }
/// ```
pub struct RxCell {
    word: AtomicU32,

    /// Fault code of the last `LineError`, published by the store to `word`.
    fault: AtomicU16,

    /// Writes dropped because the attempt was already resolved or stale.
    rejected: AtomicU32,
}

impl RxCell {
    /// Create an idle cell.
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(pack(TAG_IDLE, 0, 0)),
            fault: AtomicU16::new(0),
            rejected: AtomicU32::new(0),
        }
    }

    /// Start a new attempt: state becomes `Waiting` under a fresh generation.
    ///
    /// Must only be called when no attempt is in flight.
    #[inline]
    pub fn reset(&self) -> Ticket {
        let previous = self.word.load(Ordering::Relaxed);
        debug_assert!(
            !matches!(tag_of(previous), TAG_WAITING | TAG_LATCHING),
            "receive attempt already in flight"
        );

        let generation = generation_of(previous).wrapping_add(1);
        self.word.store(pack(TAG_WAITING, generation, 0), Ordering::Release);
        Ticket { generation }
    }

    /// Resolve the attempt identified by `ticket`.
    ///
    /// Succeeds only if that attempt is still `Waiting`. Returns `false` (and
    /// leaves the cell untouched) when another writer got there first, when
    /// the ticket is stale, or when `outcome` is not terminal.
    #[inline]
    pub fn set(&self, ticket: Ticket, outcome: RxOutcome) -> bool {
        let generation = ticket.generation;
        match outcome {
            RxOutcome::ByteReady(byte) => {
                self.claim(generation, pack(TAG_BYTE_READY, generation, byte))
            }
            RxOutcome::TimedOut => self.claim(generation, pack(TAG_TIMED_OUT, generation, 0)),
            RxOutcome::LineError(fault) => {
                if !self.claim(generation, pack(TAG_LATCHING, generation, 0)) {
                    return false;
                }
                self.fault.store(fault.raw(), Ordering::Relaxed);
                self.word
                    .store(pack(TAG_LINE_ERROR, generation, 0), Ordering::Release);
                true
            }
            RxOutcome::Idle | RxOutcome::Waiting => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Move `Waiting` of `generation` to `resolved`, or count the rejection.
    #[inline]
    fn claim(&self, generation: u16, resolved: u32) -> bool {
        let expected = pack(TAG_WAITING, generation, 0);
        match self
            .word
            .compare_exchange(expected, resolved, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// UART completion entry point (interrupt context).
    #[inline]
    pub fn on_read_complete(&self, ticket: Ticket, result: Result<u8, LineFault>) -> bool {
        let outcome = match result {
            Ok(byte) => RxOutcome::ByteReady(byte),
            Err(fault) => RxOutcome::LineError(fault),
        };
        self.set(ticket, outcome)
    }

    /// Alarm expiry entry point (interrupt context).
    ///
    /// `ticket` is the attempt the alarm was armed for. An expiry that is
    /// dispatched after its attempt ended is dropped like a stale byte.
    #[inline]
    pub fn on_alarm(&self, ticket: Ticket) -> bool {
        self.set(ticket, RxOutcome::TimedOut)
    }

    /// Non-blocking read of the current state.
    #[inline]
    pub fn poll(&self) -> RxOutcome {
        let word = self.word.load(Ordering::Acquire);
        match tag_of(word) {
            TAG_WAITING | TAG_LATCHING => RxOutcome::Waiting,
            TAG_BYTE_READY => RxOutcome::ByteReady(byte_of(word)),
            TAG_LINE_ERROR => {
                RxOutcome::LineError(LineFault::from_raw(self.fault.load(Ordering::Relaxed)))
            }
            TAG_TIMED_OUT => RxOutcome::TimedOut,
            _ => RxOutcome::Idle,
        }
    }

    /// Mark the outcome as consumed. The generation is kept so the next
    /// `reset()` moves past it.
    #[inline]
    pub fn release(&self) {
        let current = self.word.load(Ordering::Relaxed);
        self.word
            .store(pack(TAG_IDLE, generation_of(current), 0), Ordering::Release);
    }

    /// Count of dropped writes since boot (never cleared).
    #[inline]
    pub fn rejected_writes(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl Default for RxCell {
    fn default() -> Self {
        Self::new()
    }
}
