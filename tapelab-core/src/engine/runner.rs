//! SimulationEngine — the consumer loop that drains the global event queue.
//!
//! One loop serves backtest and online runs; the mode only changes the clock
//! collaborator and the termination condition. Chain discipline: per symbol,
//! one causal chain (Market → Signal → Order → Fill) is in flight at a time;
//! the next MarketEvent for a symbol is enqueued when its current chain
//! completes, and the trade-date cursor advances exactly once per chain.
//!
//! Ordering across symbols is FIFO-of-arrival. When symbols trade on
//! different calendars this does not coincide with global calendar order;
//! that limitation is inherited and intentional.

use crate::clock::ClockSource;
use crate::config::{ConfigError, SimulationConfig};
use crate::data::{with_retry, DataError, MarketDataProvider, RetryPolicy};
use crate::domain::{Bar, Event, MarketEvent};
use crate::engine::execution::ExecutionSimulator;
use crate::engine::market::MarketStream;
use crate::engine::queue::{EngineMessage, EventQueue, QueueHandle};
use crate::portfolio::{NullSnapshotStore, Portfolio, PortfolioStatistics, SnapshotStore};
use crate::strategy::{MarketData, Strategy};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Union of the symbols' trading calendars inside the window — the input a
/// backtest clock replays.
pub fn union_calendar(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<NaiveDate>, DataError> {
    let mut calendar: Vec<NaiveDate> = Vec::new();
    for symbol in symbols {
        let dates = provider.trading_dates_since(symbol, start)?;
        calendar.extend(dates.into_iter().filter(|d| *d <= end));
    }
    calendar.sort_unstable();
    calendar.dedup();
    Ok(calendar)
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("clock failed to start (already started or stopped)")]
    ClockStart,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Deployment mode; decides the termination condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Backtest,
    Online,
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub portfolio_id: String,
    pub signals: u64,
    pub orders: u64,
    pub fills: u64,
    pub statistics: PortfolioStatistics,
}

/// The event-driven simulation loop.
pub struct SimulationEngine {
    mode: EngineMode,
    provider: Arc<dyn MarketDataProvider>,
    strategy: Box<dyn Strategy>,
    clock: Box<dyn ClockSource>,
    queue: EventQueue,
    stream: MarketStream,
    portfolio: Portfolio,
    execution: ExecutionSimulator,
    store: Box<dyn SnapshotStore>,
    retry: RetryPolicy,
    /// Last known valuation price per symbol.
    prices: HashMap<String, f64>,
    /// Symbols whose current chain finished with no further released date.
    idle: HashSet<String>,
    heartbeat: Duration,
    stats_every: u32,
    periods_per_year: f64,
    signals: u64,
    orders: u64,
    fills: u64,
}

impl SimulationEngine {
    /// Build a backtest engine: per-symbol trading calendars are fetched up
    /// front and replayed through `clock`.
    pub fn backtest(
        config: &SimulationConfig,
        provider: Arc<dyn MarketDataProvider>,
        strategy: Box<dyn Strategy>,
        clock: Box<dyn ClockSource>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let retry = RetryPolicy::default();
        let mut valid_dates: HashMap<String, Vec<NaiveDate>> = HashMap::new();
        for symbol in &config.symbols {
            let dates = with_retry(&retry, "trading_dates_since", || {
                provider.trading_dates_since(symbol, config.start_date)
            })?;
            let windowed: Vec<NaiveDate> =
                dates.into_iter().filter(|d| *d <= config.end_date).collect();
            if windowed.is_empty() {
                warn!(%symbol, "no trading dates in window, symbol will be inactive");
            }
            valid_dates.insert(symbol.clone(), windowed);
        }
        let stream = MarketStream::for_backtest(valid_dates);
        Ok(Self::assemble(
            EngineMode::Backtest,
            config,
            provider,
            strategy,
            clock,
            stream,
            retry,
        ))
    }

    /// Build an online engine: trading dates arrive from the clock as
    /// sessions complete.
    pub fn online(
        config: &SimulationConfig,
        provider: Arc<dyn MarketDataProvider>,
        strategy: Box<dyn Strategy>,
        clock: Box<dyn ClockSource>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let stream = MarketStream::for_online(&config.symbols);
        Ok(Self::assemble(
            EngineMode::Online,
            config,
            provider,
            strategy,
            clock,
            stream,
            RetryPolicy::default(),
        ))
    }

    fn assemble(
        mode: EngineMode,
        config: &SimulationConfig,
        provider: Arc<dyn MarketDataProvider>,
        strategy: Box<dyn Strategy>,
        clock: Box<dyn ClockSource>,
        stream: MarketStream,
        retry: RetryPolicy,
    ) -> Self {
        let portfolio = Portfolio::new(
            config.portfolio_id.clone(),
            config.symbols.clone(),
            config.start_date,
            config.initial_capital,
            config.lot_size,
        );
        Self {
            mode,
            provider,
            strategy,
            clock,
            queue: EventQueue::new(),
            stream,
            portfolio,
            execution: ExecutionSimulator::new(config.commission.build()),
            store: Box::new(NullSnapshotStore),
            retry,
            prices: HashMap::new(),
            idle: HashSet::new(),
            heartbeat: Duration::from_millis(config.heartbeat_ms),
            stats_every: config.stats_every_heartbeats,
            periods_per_year: config.periods_per_year,
            signals: 0,
            orders: 0,
            fills: 0,
        }
    }

    /// Attach a snapshot store (fire-and-forget persistence).
    pub fn with_snapshot_store(mut self, store: Box<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Producer handle for injecting events or requesting shutdown from
    /// another thread (online mode).
    pub fn queue_handle(&self) -> QueueHandle {
        self.queue.handle()
    }

    /// Run to completion (backtest) or until shutdown (online).
    pub fn run(&mut self) -> Result<SimulationReport, EngineError> {
        if !self.clock.start() {
            return Err(EngineError::ClockStart);
        }
        info!(
            portfolio_id = %self.portfolio.portfolio_id(),
            mode = ?self.mode,
            symbols = self.portfolio.symbols().len(),
            "simulation started"
        );

        let mut empty_heartbeats = 0u32;
        loop {
            self.pump_clock();
            match self.queue.try_pop() {
                Some(EngineMessage::Shutdown) => {
                    info!("shutdown requested");
                    break;
                }
                Some(EngineMessage::Event(event)) => {
                    let symbol = event.symbol().to_string();
                    match self.dispatch(&event) {
                        Some(successor) => self.queue.push(successor),
                        None => self.finish_chain(&symbol),
                    }
                }
                None => {
                    if self.mode == EngineMode::Backtest && self.stream.all_finished() {
                        break;
                    }
                    empty_heartbeats += 1;
                    if self.stats_every > 0 && empty_heartbeats % self.stats_every == 0 {
                        self.log_statistics();
                    }
                    std::thread::sleep(self.heartbeat);
                }
            }
        }
        self.clock.stop();
        self.persist_snapshot();

        let statistics =
            PortfolioStatistics::compute(self.portfolio.holding_history(), self.periods_per_year);
        info!(
            signals = self.signals,
            orders = self.orders,
            fills = self.fills,
            total_return_pct = statistics.total_return_pct,
            sharpe = statistics.sharpe_ratio,
            max_drawdown = statistics.max_drawdown,
            "simulation finished"
        );
        Ok(SimulationReport {
            portfolio_id: self.portfolio.portfolio_id().to_string(),
            signals: self.signals,
            orders: self.orders,
            fills: self.fills,
            statistics,
        })
    }

    /// Drain pending clock ticks: release dates into the stream, seed
    /// symbols that have not started, and wake idle symbols that gained a
    /// new date.
    fn pump_clock(&mut self) {
        while let Some(tick) = self.clock.try_next() {
            for symbol in self.stream.release(&tick) {
                if self.stream.cursor(&symbol).is_none() {
                    self.seed_symbol(&symbol);
                } else if self.idle.remove(&symbol) {
                    match self.stream.advance(&symbol) {
                        Some(next) => self.queue.push(Event::Market(next)),
                        None => {
                            self.idle.insert(symbol);
                        }
                    }
                }
            }
        }
    }

    fn seed_symbol(&mut self, symbol: &str) {
        let Some(first_date) = self.stream.seed(symbol) else {
            return;
        };
        let previous_date = with_retry(&self.retry, "previous_trading_date", || {
            self.provider.previous_trading_date(symbol, first_date)
        })
        .unwrap_or_else(|err| {
            warn!(%symbol, error = %err, "previous trading date lookup failed");
            None
        });
        self.queue.push(Event::Market(MarketEvent {
            symbol: symbol.to_string(),
            date: first_date,
            previous_date,
        }));
    }

    /// The current chain for `symbol` is done: enqueue its next MarketEvent
    /// if a further date has been released, otherwise park it as idle.
    fn finish_chain(&mut self, symbol: &str) {
        match self.stream.advance(symbol) {
            Some(next) => self.queue.push(Event::Market(next)),
            None => {
                self.idle.insert(symbol.to_string());
            }
        }
    }

    /// Exhaustive dispatch; returns the chain's successor event, if any.
    fn dispatch(&mut self, event: &Event) -> Option<Event> {
        match event {
            Event::Market(market) => self.on_market(market),
            Event::Signal(signal) => {
                self.signals += 1;
                self.portfolio
                    .generate_order(signal, &self.prices)
                    .map(Event::Order)
            }
            Event::Order(order) => {
                self.orders += 1;
                match self.execution.execute(order, &self.prices) {
                    Ok(fill) => Some(Event::Fill(fill)),
                    Err(err) => {
                        warn!(symbol = %order.symbol, error = %err, "order dropped");
                        None
                    }
                }
            }
            Event::Fill(fill) => {
                self.fills += 1;
                self.portfolio.apply_fill(fill);
                debug_assert!(self.portfolio.identity_holds());
                self.persist_snapshot();
                None
            }
        }
    }

    /// Market update: mark to market first, then ask the strategy.
    fn on_market(&mut self, event: &MarketEvent) -> Option<Event> {
        let mut degraded = false;
        let valuation: Option<Bar> = match event.previous_date {
            None => None,
            Some(prev) => {
                match with_retry(&self.retry, "bar", || self.provider.bar(&event.symbol, prev)) {
                    Ok(bar) => Some(bar),
                    Err(err) if err.is_transient() => {
                        warn!(symbol = %event.symbol, date = %event.date, error = %err,
                              "provider unavailable, degrading this tick");
                        degraded = true;
                        None
                    }
                    Err(err) => {
                        debug!(symbol = %event.symbol, date = %event.date, error = %err,
                               "no valuation bar");
                        None
                    }
                }
            }
        };
        if let Some(bar) = &valuation {
            self.prices.insert(event.symbol.clone(), bar.adj_close);
        }

        self.portfolio.apply_market(event, &self.prices);
        debug_assert!(self.portfolio.identity_holds());

        if degraded {
            return None;
        }

        let features = event.previous_date.and_then(|prev| {
            with_retry(&self.retry, "features", || {
                self.provider.features(&event.symbol, prev)
            })
            .ok()
        });
        let data = MarketData {
            bar: valuation.as_ref(),
            features: features.as_ref(),
        };
        self.strategy
            .calculate_signals(event, &data)
            .map(Event::Signal)
    }

    fn persist_snapshot(&self) {
        let snapshot = self.portfolio.snapshot();
        if let Err(err) = self.store.save(self.portfolio.portfolio_id(), &snapshot) {
            warn!(error = %err, "snapshot persistence failed, continuing");
        }
    }

    fn log_statistics(&self) {
        let statistics =
            PortfolioStatistics::compute(self.portfolio.holding_history(), self.periods_per_year);
        info!(
            total_return_pct = statistics.total_return_pct,
            sharpe = statistics.sharpe_ratio,
            max_drawdown = statistics.max_drawdown,
            drawdown_duration = statistics.drawdown_duration,
            "interim statistics"
        );
    }
}
