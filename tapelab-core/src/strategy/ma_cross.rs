//! Moving-average crossover — the bundled demo strategy.
//!
//! Keeps a rolling window of adjusted closes per symbol. Once the long
//! window is full: short mean above long mean is Up, below is Down, equal is
//! Hold. Entry/exit discipline (only buy when flat, sell the whole book) is
//! the ledger's job, so the strategy emits its opinion every tick.

use super::{MarketData, Strategy};
use crate::domain::{MarketEvent, SignalEvent, SignalKind};
use std::collections::{HashMap, VecDeque};

pub struct MaCrossStrategy {
    strategy_id: u32,
    short_window: usize,
    long_window: usize,
    closes: HashMap<String, VecDeque<f64>>,
}

impl MaCrossStrategy {
    /// Panics if `short_window` is zero or not shorter than `long_window`.
    pub fn new(strategy_id: u32, short_window: usize, long_window: usize) -> Self {
        assert!(short_window >= 1, "short window must be >= 1");
        assert!(
            short_window < long_window,
            "short window must be shorter than long window"
        );
        Self {
            strategy_id,
            short_window,
            long_window,
            closes: HashMap::new(),
        }
    }

    fn mean_of_last(window: &VecDeque<f64>, n: usize) -> f64 {
        window.iter().rev().take(n).sum::<f64>() / n as f64
    }
}

impl Strategy for MaCrossStrategy {
    fn strategy_id(&self) -> u32 {
        self.strategy_id
    }

    fn calculate_signals(
        &mut self,
        event: &MarketEvent,
        data: &MarketData<'_>,
    ) -> Option<SignalEvent> {
        let bar = data.bar?;
        let window = self.closes.entry(event.symbol.clone()).or_default();
        window.push_back(bar.adj_close);
        if window.len() > self.long_window {
            window.pop_front();
        }
        if window.len() < self.long_window {
            return None;
        }

        let short_mav = Self::mean_of_last(window, self.short_window);
        let long_mav = Self::mean_of_last(window, self.long_window);
        let signal = if short_mav > long_mav {
            SignalKind::Up
        } else if short_mav < long_mav {
            SignalKind::Down
        } else {
            SignalKind::Hold
        };

        Some(SignalEvent {
            symbol: event.symbol.clone(),
            date: event.date,
            strategy_id: self.strategy_id,
            signal,
            strength: None,
        })
    }
}
