//! receive_byte / send_byte behaviour on the simulated board

mod common;

use common::{deliver_late, script, sim_io, LineEvent};
use xmodem_io_uart::logging::LogStream;
use xmodem_io_uart::{IoConfig, IoError, LineFault, RxCell, RxOutcome};

#[test]
fn test_byte_before_timeout() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(&cell, &log, IoConfig::default(), &[LineEvent::Byte(0x7E)]);

    let mut byte = 0u8;
    assert_eq!(io.receive_byte(&mut byte), Ok(()));
    assert_eq!(byte, 0x7E);

    // Armed once, disarmed once, nothing left running
    let state = state.borrow();
    assert_eq!(state.alarm_configs.len(), 2);
    assert!(state.alarm_configs[0].enabled);
    assert!(!state.alarm_configs[1].enabled);
    assert!(!state.alarm_enabled);
    assert_eq!(state.alarm_fired, 0);
    assert_eq!(state.cancelled, 0);
    assert!(!io.is_timeout_armed());
}

#[test]
fn test_no_stray_timeout_after_success() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(
        &cell,
        &log,
        IoConfig::default(),
        &[LineEvent::Byte(0x01), LineEvent::Byte(0x02)],
    );

    assert_eq!(io.recv(), Ok(0x01));
    // An expiry of the first call's alarm cannot resolve anything later
    let first = state.borrow().started[0];
    assert!(!cell.on_alarm(first));
    assert_eq!(io.recv(), Ok(0x02));
    assert_eq!(io.stats().timeouts, 0);
}

#[test]
fn test_queued_alarm_does_not_time_out_next_call() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(
        &cell,
        &log,
        IoConfig::default(),
        &[LineEvent::ByteThenQueuedAlarm(0x41), LineEvent::Byte(0x42)],
    );

    assert_eq!(io.recv(), Ok(0x41));
    assert!(state.borrow().queued_alarm.is_some());

    // The first call's expiry runs after the second call has reset the cell
    assert_eq!(io.recv(), Ok(0x42));
    assert!(state.borrow().queued_alarm.is_none());
    assert_eq!(state.borrow().alarm_fired, 1);
    assert_eq!(cell.rejected_writes(), 1);
    assert_eq!(io.stats().timeouts, 0);
}

#[test]
fn test_alarm_armed_for_current_attempt() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(
        &cell,
        &log,
        IoConfig::default(),
        &[LineEvent::Byte(0x01), LineEvent::Silence],
    );

    let _ = io.recv();
    let _ = io.recv();

    let state = state.borrow();
    let armed: Vec<_> = state
        .alarm_configs
        .iter()
        .filter(|c| c.enabled)
        .map(|c| c.ticket)
        .collect();
    assert_eq!(armed, state.started);
}

#[test]
fn test_silence_times_out() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(&cell, &log, IoConfig::default(), &[LineEvent::Silence]);

    let mut byte = 0xAAu8;
    assert_eq!(io.receive_byte(&mut byte), Err(IoError::TimedOut));
    assert_eq!(byte, 0xAA, "output untouched on timeout");

    let state = state.borrow();
    assert_eq!(state.alarm_fired, 1);
    assert_eq!(state.cancelled, 1);
    assert!(!state.alarm_enabled);
}

#[test]
fn test_late_byte_does_not_leak_into_next_call() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(&cell, &log, IoConfig::default(), &[LineEvent::LateByte(0xEE)]);

    assert_eq!(io.recv(), Err(IoError::TimedOut));
    assert_eq!(state.borrow().cancelled, 1);

    // 0xEE lands while the next attempt is waiting
    script(&state, &[LineEvent::Byte(0x42)]);
    assert_eq!(io.recv(), Ok(0x42));
    assert!(state.borrow().late.is_none());
    assert_eq!(cell.rejected_writes(), 1);

    // Same when the next attempt itself times out
    script(&state, &[LineEvent::LateByte(0xEF), LineEvent::Silence]);
    assert_eq!(io.recv(), Err(IoError::TimedOut));
    assert_eq!(io.recv(), Err(IoError::TimedOut));
    assert_eq!(io.stats().bytes_received, 1);
}

#[test]
fn test_late_byte_after_return_is_ignored() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(
        &cell,
        &log,
        IoConfig::default(),
        &[LineEvent::LateByte(0xEE), LineEvent::Byte(0x42)],
    );

    assert_eq!(io.recv(), Err(IoError::TimedOut));
    assert!(!deliver_late(&cell, &state));
    assert_eq!(cell.poll(), RxOutcome::Idle);

    assert_eq!(io.recv(), Ok(0x42));
}

#[test]
fn test_line_fault_code_passed_through() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let fault = LineFault::from_raw(0x1234);
    let (mut io, state) = sim_io(&cell, &log, IoConfig::default(), &[LineEvent::Fault(fault)]);

    let mut byte = 0u8;
    let err = io.receive_byte(&mut byte).unwrap_err();
    assert_eq!(err, IoError::LineError(fault));
    assert_eq!(err.line_fault().map(|f| f.raw()), Some(0x1234));

    let state = state.borrow();
    assert_eq!(state.cancelled, 0);
    assert!(!state.alarm_enabled);
}

#[test]
fn test_sequential_bytes_no_leakage() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(
        &cell,
        &log,
        IoConfig::default(),
        &[LineEvent::Byte(0x41), LineEvent::Byte(0x42)],
    );

    let mut byte = 0u8;
    assert_eq!(io.receive_byte(&mut byte), Ok(()));
    assert_eq!(byte, 0x41);
    assert_eq!(io.receive_byte(&mut byte), Ok(()));
    assert_eq!(byte, 0x42);

    // Each call ran under its own attempt
    let state = state.borrow();
    assert_eq!(state.started.len(), 2);
    assert_ne!(state.started[0], state.started[1]);
}

#[test]
fn test_simultaneous_byte_wins_when_served_first() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, _state) =
        sim_io(&cell, &log, IoConfig::default(), &[LineEvent::ByteThenAlarm(0x33)]);

    assert_eq!(io.recv(), Ok(0x33));
    assert_eq!(cell.rejected_writes(), 1);
}

#[test]
fn test_simultaneous_alarm_wins_when_served_first() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) =
        sim_io(&cell, &log, IoConfig::default(), &[LineEvent::AlarmThenByte(0x33)]);

    assert_eq!(io.recv(), Err(IoError::TimedOut));
    assert_eq!(cell.rejected_writes(), 1);
    assert_eq!(state.borrow().cancelled, 1);
}

#[test]
fn test_never_left_waiting() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let events = [
        LineEvent::Byte(1),
        LineEvent::Silence,
        LineEvent::Fault(LineFault::FRAMING),
        LineEvent::LateByte(2),
        LineEvent::ByteThenAlarm(3),
        LineEvent::AlarmThenByte(4),
        LineEvent::ByteThenQueuedAlarm(5),
        LineEvent::Byte(6),
    ];
    let (mut io, _state) = sim_io(&cell, &log, IoConfig::default(), &events);

    for _ in 0..events.len() {
        let _ = io.recv();
        assert_eq!(cell.poll(), RxOutcome::Idle);
        assert!(!io.is_timeout_armed());
    }
}

#[test]
fn test_start_failure_reported_without_waiting() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(&cell, &log, IoConfig::default(), &[]);
    state.borrow_mut().start_fault = Some(LineFault::OVERRUN);

    assert_eq!(io.recv(), Err(IoError::LineError(LineFault::OVERRUN)));
    assert_eq!(cell.poll(), RxOutcome::Idle);

    let state = state.borrow();
    assert!(!state.alarm_enabled);
    assert_eq!(state.alarm_fired, 0);
}

#[test]
fn test_send_byte() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, state) = sim_io(&cell, &log, IoConfig::default(), &[]);

    assert_eq!(io.send_byte(0x06), Ok(()));
    state.borrow_mut().send_fault = Some(LineFault::BREAK);
    assert_eq!(io.send_byte(0x15), Err(IoError::LineError(LineFault::BREAK)));

    assert_eq!(state.borrow().sent, vec![0x06]);
    let stats = io.stats();
    assert_eq!(stats.bytes_sent, 1);
    assert_eq!(stats.send_errors, 1);
}

#[test]
fn test_stats_track_outcomes() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, _state) = sim_io(
        &cell,
        &log,
        IoConfig::default(),
        &[
            LineEvent::Byte(0x10),
            LineEvent::Silence,
            LineEvent::Fault(LineFault::PARITY),
            LineEvent::Byte(0x11),
        ],
    );

    for _ in 0..4 {
        let _ = io.recv();
    }

    let stats = io.stats();
    assert_eq!(stats.bytes_received, 2);
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.line_errors, 1);
}

#[test]
fn test_receive_path_does_not_log() {
    let cell = RxCell::new();
    let log: LogStream = LogStream::new();
    let (mut io, _state) = sim_io(
        &cell,
        &log,
        IoConfig::default(),
        &[LineEvent::Silence, LineEvent::Fault(LineFault::BREAK)],
    );

    let _ = io.recv();
    let _ = io.recv();
    assert!(!log.has_entries());
}
