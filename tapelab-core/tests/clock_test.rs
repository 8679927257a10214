//! Clock lifecycle tests: start/pause/resume/stop across both generators.

use chrono::NaiveDate;
use std::time::Duration;
use tapelab_core::clock::{BacktestClock, ClockSource, ClockState, Gate, GatePass};

fn dates(days: &[u32]) -> Vec<NaiveDate> {
    days.iter()
        .map(|d| NaiveDate::from_ymd_opt(2024, 1, *d).unwrap())
        .collect()
}

fn drain_for(clock: &BacktestClock, window: Duration) -> usize {
    let deadline = std::time::Instant::now() + window;
    let mut count = 0;
    while std::time::Instant::now() < deadline {
        if clock.try_next().is_some() {
            count += 1;
        } else {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
    count
}

/// Pause followed immediately by stop, before any resume: zero additional
/// ticks are ever produced.
#[test]
fn pause_then_stop_produces_no_further_ticks() {
    let mut clock = BacktestClock::new(dates(&[2, 3, 4, 5]));
    clock.pause();
    assert!(clock.start());
    clock.stop(); // joins the producer
    assert_eq!(clock.state(), ClockState::Stopped);
    assert_eq!(drain_for(&clock, Duration::from_millis(30)), 0);
}

/// The same contract at the gate level, with no threads involved: a waiter
/// arriving after pause → stop observes Stopped, never Proceed.
#[test]
fn gate_pause_stop_is_race_free() {
    let gate = Gate::new();
    gate.start();
    gate.pause();
    gate.stop();
    assert_eq!(gate.wait_ready(), GatePass::Stopped);
    // resume after terminal stop must not reopen the gate
    gate.resume();
    assert_eq!(gate.wait_ready(), GatePass::Stopped);
}

#[test]
fn full_calendar_is_replayed_then_stream_ends() {
    let mut clock = BacktestClock::new(dates(&[2, 3, 4]));
    assert!(clock.start());
    assert_eq!(drain_for(&clock, Duration::from_millis(200)), 3);
    clock.stop();
}

#[test]
fn resume_continues_where_pause_left_off() {
    let mut clock = BacktestClock::new(dates(&[2, 3, 4, 5, 8, 9]));
    clock.pause();
    assert!(clock.start());
    assert_eq!(clock.state(), ClockState::Paused);
    assert_eq!(drain_for(&clock, Duration::from_millis(30)), 0);

    clock.resume();
    assert_eq!(clock.state(), ClockState::Running);
    assert_eq!(drain_for(&clock, Duration::from_millis(200)), 6);
    clock.stop();
}

#[test]
fn stop_is_idempotent() {
    let mut clock = BacktestClock::new(dates(&[2, 3]));
    assert!(clock.start());
    clock.stop();
    clock.stop();
    assert_eq!(clock.state(), ClockState::Stopped);
    assert!(!clock.start());
}

/// A stopped clock unblocks its producer within one heartbeat: stop()
/// returns promptly because it joins the thread.
#[test]
fn stop_returns_promptly_while_paused() {
    let mut clock = BacktestClock::new(dates(&[2, 3, 4]));
    clock.pause();
    assert!(clock.start());
    let started = std::time::Instant::now();
    clock.stop();
    assert!(started.elapsed() < Duration::from_secs(2));
}
