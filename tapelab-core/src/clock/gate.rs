//! Gate — the pause/resume/stop state machine shared by clock producers.
//!
//! Replaces ad-hoc boolean flags with an explicit state machine behind a
//! `Mutex` + `Condvar`, so transitions are race-free and testable without
//! real timing. Lifecycle: `Stopped → Running ⇄ Paused → Stopped`, where the
//! final stop is terminal. `stop()` wakes every waiter immediately; no
//! producer blocks past it.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Externally visible clock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

/// What a producer should do after waiting at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePass {
    Proceed,
    Stopped,
}

#[derive(Debug)]
struct GateInner {
    started: bool,
    paused: bool,
    stopped: bool,
}

/// Cancellable gate for tick producers.
#[derive(Debug)]
pub struct Gate {
    inner: Mutex<GateInner>,
    cond: Condvar,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                started: false,
                paused: false,
                stopped: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Transition to Running. Returns false if already started or
    /// terminally stopped. Pausing before `start` is honoured: the gate
    /// opens into the Paused state and producers block on their first tick.
    pub fn start(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.stopped || inner.started {
            return false;
        }
        inner.started = true;
        self.cond.notify_all();
        true
    }

    /// Suspend tick production without losing state.
    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.stopped {
            inner.paused = true;
        }
    }

    /// Resume after a pause. No-op once stopped.
    pub fn resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.stopped {
            inner.paused = false;
            self.cond.notify_all();
        }
    }

    /// Terminal stop. Idempotent; unblocks every waiter immediately.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stopped = true;
        self.cond.notify_all();
    }

    pub fn state(&self) -> ClockState {
        let inner = self.inner.lock().unwrap();
        if inner.stopped || !inner.started {
            ClockState::Stopped
        } else if inner.paused {
            ClockState::Paused
        } else {
            ClockState::Running
        }
    }

    /// Block until the gate is open (started, not paused) or stopped.
    pub fn wait_ready(&self) -> GatePass {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.stopped {
                return GatePass::Stopped;
            }
            if inner.started && !inner.paused {
                return GatePass::Proceed;
            }
            inner = self.cond.wait(inner).unwrap();
        }
    }

    /// Like [`wait_ready`](Self::wait_ready) but gives up after `timeout`.
    /// Returns None on timeout. Used in tests to keep waits bounded.
    pub fn wait_ready_timeout(&self, timeout: Duration) -> Option<GatePass> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.stopped {
                return Some(GatePass::Stopped);
            }
            if inner.started && !inner.paused {
                return Some(GatePass::Proceed);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, result) = self.cond.wait_timeout(inner, remaining).unwrap();
            inner = guard;
            if result.timed_out() && !inner.stopped && !(inner.started && !inner.paused) {
                return None;
            }
        }
    }

    /// Interruptible sleep: waits `dur` unless stopped first.
    pub fn sleep(&self, dur: Duration) -> GatePass {
        let deadline = Instant::now() + dur;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.stopped {
                return GatePass::Stopped;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return GatePass::Proceed;
            };
            let (guard, _) = self.cond.wait_timeout(inner, remaining).unwrap();
            inner = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped() {
        let gate = Gate::new();
        assert_eq!(gate.state(), ClockState::Stopped);
    }

    #[test]
    fn start_transitions_to_running() {
        let gate = Gate::new();
        assert!(gate.start());
        assert_eq!(gate.state(), ClockState::Running);
        assert_eq!(gate.wait_ready(), GatePass::Proceed);
    }

    #[test]
    fn start_twice_fails() {
        let gate = Gate::new();
        assert!(gate.start());
        assert!(!gate.start());
    }

    #[test]
    fn pause_and_resume() {
        let gate = Gate::new();
        gate.start();
        gate.pause();
        assert_eq!(gate.state(), ClockState::Paused);
        assert_eq!(gate.wait_ready_timeout(Duration::from_millis(10)), None);
        gate.resume();
        assert_eq!(gate.state(), ClockState::Running);
        assert_eq!(gate.wait_ready(), GatePass::Proceed);
    }

    #[test]
    fn pause_then_stop_never_proceeds() {
        let gate = Gate::new();
        gate.start();
        gate.pause();
        gate.stop();
        assert_eq!(gate.state(), ClockState::Stopped);
        assert_eq!(gate.wait_ready(), GatePass::Stopped);
    }

    #[test]
    fn stop_is_idempotent_and_terminal() {
        let gate = Gate::new();
        gate.start();
        gate.stop();
        gate.stop();
        assert!(!gate.start());
        gate.resume();
        assert_eq!(gate.state(), ClockState::Stopped);
        assert_eq!(gate.wait_ready(), GatePass::Stopped);
    }

    #[test]
    fn stop_unblocks_sleepers() {
        use std::sync::Arc;
        let gate = Arc::new(Gate::new());
        gate.start();
        let sleeper = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.sleep(Duration::from_secs(60)))
        };
        std::thread::sleep(Duration::from_millis(20));
        gate.stop();
        assert_eq!(sleeper.join().unwrap(), GatePass::Stopped);
    }
}
