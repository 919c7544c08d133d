//! Simulated board for the integration tests.
//!
//! The line driver "raises its interrupt" synchronously from `start_read`,
//! following a per-test script. Simulated time only advances past the 2 s
//! window when the script says nothing arrives, and the alarm only fires if
//! it is armed at that moment.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use xmodem_io_uart::logging::LogStream;
use xmodem_io_uart::{
    AlarmConfig, AlarmTimer, IoConfig, IoError, IrqSource, LineFault, Peripheral,
    PlatformSetup, RxCell, SerialLine, Ticket, UartConfig, XmodemIo,
};

/// What the line does once a read has been started.
#[derive(Clone, Copy, Debug)]
pub enum LineEvent {
    /// A byte arrives inside the window.
    Byte(u8),
    /// The UART reports a fault.
    Fault(LineFault),
    /// Nothing arrives; the window elapses.
    Silence,
    /// Nothing inside the window; the byte shows up after the alarm.
    LateByte(u8),
    /// Byte and alarm together, byte interrupt served first.
    ByteThenAlarm(u8),
    /// Byte and alarm together, alarm interrupt served first.
    AlarmThenByte(u8),
    /// Byte right at the end of the window; the expiry was already queued
    /// when the alarm got disarmed and runs during the next attempt.
    ByteThenQueuedAlarm(u8),
}

#[derive(Default)]
pub struct SimState {
    pub script: VecDeque<LineEvent>,
    pub uart_config: Option<UartConfig>,
    pub started: Vec<Ticket>,
    pub cancelled: u32,
    pub late: Option<(Ticket, u8)>,
    pub start_fault: Option<LineFault>,
    pub sent: Vec<u8>,
    pub send_fault: Option<LineFault>,
    pub alarm_enabled: bool,
    pub alarm_configs: Vec<AlarmConfig>,
    pub alarm_fired: u32,
    pub queued_alarm: Option<Ticket>,
}

pub type Shared = Rc<RefCell<SimState>>;

/// Simulated expiry of the receive window.
fn elapse_window(cell: &RxCell, state: &mut SimState) {
    assert!(state.alarm_enabled, "receive window elapsed with the alarm disarmed");
    state.alarm_fired += 1;
    cell.on_alarm(armed_ticket(state));
}

/// Ticket the alarm was last armed with.
fn armed_ticket(state: &SimState) -> Ticket {
    state
        .alarm_configs
        .iter()
        .rev()
        .find(|c| c.enabled)
        .map(|c| c.ticket)
        .expect("alarm never armed")
}

pub struct SimLine<'a> {
    cell: &'a RxCell,
    state: Shared,
}

impl SerialLine for SimLine<'_> {
    fn configure(&mut self, config: &UartConfig) -> Result<(), IoError> {
        self.state.borrow_mut().uart_config = Some(*config);
        Ok(())
    }

    fn start_read(&mut self, ticket: Ticket) -> Result<(), LineFault> {
        let mut state = self.state.borrow_mut();
        if let Some(fault) = state.start_fault.take() {
            return Err(fault);
        }
        state.started.push(ticket);

        // A UART that ignored the last cancel delivers its byte now, while
        // the new attempt is waiting.
        if let Some((stale, byte)) = state.late.take() {
            self.cell.on_read_complete(stale, Ok(byte));
        }
        // Same for an expiry the timer task dispatched after the disarm.
        if let Some(stale) = state.queued_alarm.take() {
            state.alarm_fired += 1;
            self.cell.on_alarm(stale);
        }

        let event = state.script.pop_front().unwrap_or(LineEvent::Silence);
        match event {
            LineEvent::Byte(byte) => {
                self.cell.on_read_complete(ticket, Ok(byte));
            }
            LineEvent::Fault(fault) => {
                self.cell.on_read_complete(ticket, Err(fault));
            }
            LineEvent::Silence => elapse_window(self.cell, &mut state),
            LineEvent::LateByte(byte) => {
                elapse_window(self.cell, &mut state);
                state.late = Some((ticket, byte));
            }
            LineEvent::ByteThenAlarm(byte) => {
                self.cell.on_read_complete(ticket, Ok(byte));
                elapse_window(self.cell, &mut state);
            }
            LineEvent::AlarmThenByte(byte) => {
                elapse_window(self.cell, &mut state);
                self.cell.on_read_complete(ticket, Ok(byte));
            }
            LineEvent::ByteThenQueuedAlarm(byte) => {
                self.cell.on_read_complete(ticket, Ok(byte));
                state.queued_alarm = Some(armed_ticket(&state));
            }
        }
        Ok(())
    }

    fn cancel_read(&mut self) {
        self.state.borrow_mut().cancelled += 1;
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), LineFault> {
        let mut state = self.state.borrow_mut();
        if let Some(fault) = state.send_fault.take() {
            return Err(fault);
        }
        state.sent.push(byte);
        Ok(())
    }
}

pub struct SimAlarm {
    state: Shared,
}

impl AlarmTimer for SimAlarm {
    fn configure(&mut self, config: &AlarmConfig) -> Result<(), IoError> {
        let mut state = self.state.borrow_mut();
        state.alarm_enabled = config.enabled;
        state.alarm_configs.push(*config);
        Ok(())
    }
}

/// Deliver the byte owed by a cancelled read, as a UART that ignored the
/// cancel would. Returns whether the cell accepted it.
pub fn deliver_late(cell: &RxCell, state: &Shared) -> bool {
    let (ticket, byte) = state
        .borrow_mut()
        .late
        .take()
        .expect("no late byte scripted");
    cell.on_read_complete(ticket, Ok(byte))
}

pub type SimIo<'a> = XmodemIo<'a, SimLine<'a>, SimAlarm>;

/// Build an `XmodemIo` on the simulated board, scripted with `events`.
pub fn sim_io<'a>(
    cell: &'a RxCell,
    log: &'a LogStream,
    config: IoConfig,
    events: &[LineEvent],
) -> (SimIo<'a>, Shared) {
    let state: Shared = Rc::new(RefCell::new(SimState::default()));
    state.borrow_mut().script.extend(events.iter().copied());

    let line = SimLine {
        cell,
        state: Rc::clone(&state),
    };
    let alarm = SimAlarm {
        state: Rc::clone(&state),
    };
    let io = XmodemIo::new(cell, line, alarm, config).with_log(log);
    (io, state)
}

/// Queue more line events.
pub fn script(state: &Shared, events: &[LineEvent]) {
    state.borrow_mut().script.extend(events.iter().copied());
}

/// Records every setup call as a string, optionally failing one of them.
#[derive(Default)]
pub struct SimPlatform {
    pub calls: Vec<String>,
    pub fail_irq: Option<IrqSource>,
    pub now_us: i64,
}

impl PlatformSetup for SimPlatform {
    fn configure_pin_function(&mut self, pin: u8, function: u8) -> Result<(), IoError> {
        self.calls.push(format!("pinmux {} fn{}", pin, function));
        Ok(())
    }

    fn enable_input(&mut self, pin: u8) -> Result<(), IoError> {
        self.calls.push(format!("input {}", pin));
        Ok(())
    }

    fn enable_peripheral_clock(&mut self, peripheral: Peripheral) -> Result<(), IoError> {
        self.calls.push(format!("clock {:?}", peripheral));
        Ok(())
    }

    fn register_interrupt(&mut self, source: IrqSource) -> Result<(), IoError> {
        if self.fail_irq == Some(source) {
            return Err(IoError::InvalidArgument);
        }
        self.calls.push(format!("irq {:?}", source));
        Ok(())
    }

    fn now_us(&self) -> i64 {
        self.now_us
    }
}
