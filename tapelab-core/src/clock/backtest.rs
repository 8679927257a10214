//! Backtest clock — replays a precomputed trading calendar.
//!
//! On `start()` a producer thread walks the calendar and emits one tick per
//! trading date through the gate into the clock's output channel. The output
//! channel is separate from the global event queue so calendar production is
//! decoupled from symbol processing.

use super::gate::{ClockState, Gate, GatePass};
use super::{ClockSource, ClockTick};
use chrono::NaiveDate;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct BacktestClock {
    calendar: Vec<NaiveDate>,
    gate: Arc<Gate>,
    tx: Sender<ClockTick>,
    rx: Receiver<ClockTick>,
    handle: Option<JoinHandle<()>>,
}

impl BacktestClock {
    /// Build from the trading calendar for the requested window. Dates are
    /// sorted and deduplicated; ticks are calendar-wide (`symbol: None`).
    pub fn new(mut calendar: Vec<NaiveDate>) -> Self {
        calendar.sort_unstable();
        calendar.dedup();
        let (tx, rx) = unbounded();
        Self {
            calendar,
            gate: Arc::new(Gate::new()),
            tx,
            rx,
            handle: None,
        }
    }

    pub fn calendar_len(&self) -> usize {
        self.calendar.len()
    }
}

impl ClockSource for BacktestClock {
    fn start(&mut self) -> bool {
        if !self.gate.start() {
            return false;
        }
        let calendar = self.calendar.clone();
        let gate = Arc::clone(&self.gate);
        let tx = self.tx.clone();
        let handle = std::thread::Builder::new()
            .name("tapelab-clock".into())
            .spawn(move || {
                for date in calendar {
                    match gate.wait_ready() {
                        GatePass::Stopped => break,
                        GatePass::Proceed => {
                            if tx.send(ClockTick { date, symbol: None }).is_err() {
                                break;
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn clock thread");
        self.handle = Some(handle);
        true
    }

    fn pause(&self) {
        self.gate.pause();
    }

    fn resume(&self) {
        self.gate.resume();
    }

    fn stop(&mut self) {
        self.gate.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn try_next(&self) -> Option<ClockTick> {
        self.rx.try_recv().ok()
    }

    fn state(&self) -> ClockState {
        self.gate.state()
    }
}

impl Drop for BacktestClock {
    fn drop(&mut self) {
        self.stop();
    }
}
