//! Online clock — polls wall-clock time and emits one tick per completed
//! trading session per symbol.
//!
//! Each poll normalises "now" to the exchange's daily close: before today's
//! close the most recent completed session is yesterday's, after it today's.
//! A per-symbol set of already-emitted session dates guarantees a session is
//! never announced twice. The time source is injectable so tests run without
//! real timing.

use super::gate::{ClockState, Gate, GatePass};
use super::{ClockSource, ClockTick};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Source of "now" for the polling loop.
pub type TimeSource = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct OnlineClock {
    symbols: Vec<String>,
    close_time: NaiveTime,
    poll_interval: Duration,
    time_source: TimeSource,
    gate: Arc<Gate>,
    tx: Sender<ClockTick>,
    rx: Receiver<ClockTick>,
    handle: Option<JoinHandle<()>>,
}

impl OnlineClock {
    pub fn new(symbols: Vec<String>, close_time: NaiveTime, poll_interval: Duration) -> Self {
        Self::with_time_source(symbols, close_time, poll_interval, Arc::new(Utc::now))
    }

    /// Inject a custom time source (tests, replay).
    pub fn with_time_source(
        symbols: Vec<String>,
        close_time: NaiveTime,
        poll_interval: Duration,
        time_source: TimeSource,
    ) -> Self {
        let (tx, rx) = unbounded();
        Self {
            symbols,
            close_time,
            poll_interval,
            time_source,
            gate: Arc::new(Gate::new()),
            tx,
            rx,
            handle: None,
        }
    }
}

/// The most recently completed session date at `now`: today once the close
/// has passed, otherwise the previous calendar day.
pub fn session_close_date(now: DateTime<Utc>, close_time: NaiveTime) -> NaiveDate {
    if now.time() >= close_time {
        now.date_naive()
    } else {
        now.date_naive() - ChronoDuration::days(1)
    }
}

impl ClockSource for OnlineClock {
    fn start(&mut self) -> bool {
        if !self.gate.start() {
            return false;
        }
        let symbols = self.symbols.clone();
        let close_time = self.close_time;
        let poll_interval = self.poll_interval;
        let time_source = Arc::clone(&self.time_source);
        let gate = Arc::clone(&self.gate);
        let tx = self.tx.clone();
        let handle = std::thread::Builder::new()
            .name("tapelab-online-clock".into())
            .spawn(move || {
                let mut emitted: HashSet<(String, NaiveDate)> = HashSet::new();
                loop {
                    if gate.wait_ready() == GatePass::Stopped {
                        break;
                    }
                    let now = time_source();
                    let session = session_close_date(now, close_time);
                    for symbol in &symbols {
                        if emitted.insert((symbol.clone(), session)) {
                            debug!(%symbol, %session, "announcing completed session");
                            let tick = ClockTick {
                                date: session,
                                symbol: Some(symbol.clone()),
                            };
                            if tx.send(tick).is_err() {
                                return;
                            }
                        }
                    }
                    if gate.sleep(poll_interval) == GatePass::Stopped {
                        break;
                    }
                }
            })
            .expect("failed to spawn online clock thread");
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

impl Drop for OnlineClock {
    fn drop(&mut self) {
        self.stop();
    }
}
