//! Receive timeout arming.
//!
//! Guarantees a receive attempt cannot block forever. The alarm config is
//! created once and only its `enabled` flag and attempt ticket change per
//! attempt, so no allocation and no separate cancel primitive are needed.
//!
//! The alarm is armed with the attempt's [`Ticket`]. Disarming a hardware
//! timer does not recall an expiry that is already being dispatched, and the
//! ticket is what keeps such an expiry from timing out the next attempt.

use crate::config::AlarmConfig;
use crate::error::IoError;
use crate::hal::AlarmTimer;
use crate::state::Ticket;

/// Owns the alarm peripheral and its long-lived config.
pub struct RxTimeout<A> {
    alarm: A,
    config: AlarmConfig,
}

impl<A: AlarmTimer> RxTimeout<A> {
    /// Wrap an alarm. It stays disarmed until [`arm`](Self::arm).
    pub fn new(alarm: A) -> Self {
        Self {
            alarm,
            config: AlarmConfig::new(),
        }
    }

    /// Push the disabled config to the hardware (used by `init()`).
    pub fn configure(&mut self) -> Result<(), IoError> {
        self.config.enabled = false;
        self.alarm.configure(&self.config)
    }

    /// Start the countdown for `ticket`. Expiry calls
    /// `RxCell::on_alarm(ticket)`.
    #[inline]
    pub fn arm(&mut self, ticket: Ticket) -> Result<(), IoError> {
        self.config.enabled = true;
        self.config.ticket = ticket;
        self.alarm.configure(&self.config)
    }

    /// Stop the countdown. Called on every exit path of an attempt.
    ///
    /// `enabled` is cleared even if the driver reports an error.
    #[inline]
    pub fn disarm(&mut self) -> Result<(), IoError> {
        self.config.enabled = false;
        self.alarm.configure(&self.config)
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.config.enabled
    }

    #[inline]
    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    pub fn into_inner(self) -> A {
        self.alarm
    }
}
