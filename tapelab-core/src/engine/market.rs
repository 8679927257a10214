//! MarketStream — per-symbol trade-date sequences and cursors.
//!
//! The stream owns, per symbol, the ascending sequence of *released* trading
//! dates and a cursor marking the date most recently turned into a
//! MarketEvent. Clock ticks release dates; the engine seeds the first event
//! per symbol and advances the cursor by exactly one per completed market
//! chain. The cursor never decreases and never exceeds the sequence length.
//!
//! In backtest mode the stream also knows each symbol's full valid-date set
//! (from the provider), so calendar-wide ticks only release dates on which
//! the symbol actually traded, and "finished" means every valid date was
//! released and consumed.

use crate::clock::ClockTick;
use crate::domain::MarketEvent;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Default)]
struct SymbolStream {
    /// Released dates, ascending.
    released: Vec<NaiveDate>,
    /// Index into `released` of the date last emitted as a MarketEvent.
    cursor: Option<usize>,
    /// Backtest only: the symbol's complete trading-date set in the window.
    valid: Option<BTreeSet<NaiveDate>>,
}

impl SymbolStream {
    fn fully_released(&self) -> bool {
        match &self.valid {
            Some(valid) => self.released.len() == valid.len(),
            // Online streams never exhaust.
            None => false,
        }
    }

    fn consumed(&self) -> bool {
        match self.cursor {
            Some(i) => i + 1 >= self.released.len(),
            None => self.released.is_empty(),
        }
    }
}

/// Per-symbol released dates plus cursors.
#[derive(Debug, Default)]
pub struct MarketStream {
    streams: HashMap<String, SymbolStream>,
}

impl MarketStream {
    /// Backtest stream: each symbol's full trading-date set is known up
    /// front and gates which calendar ticks it accepts.
    pub fn for_backtest(valid_dates: HashMap<String, Vec<NaiveDate>>) -> Self {
        let streams = valid_dates
            .into_iter()
            .map(|(symbol, dates)| {
                let stream = SymbolStream {
                    released: Vec::new(),
                    cursor: None,
                    valid: Some(dates.into_iter().collect()),
                };
                (symbol, stream)
            })
            .collect();
        Self { streams }
    }

    /// Online stream: dates are accepted as the clock announces them.
    pub fn for_online(symbols: &[String]) -> Self {
        let streams = symbols
            .iter()
            .map(|s| (s.clone(), SymbolStream::default()))
            .collect();
        Self { streams }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    /// Feed one clock tick in. Returns the symbols that gained a new date.
    pub fn release(&mut self, tick: &ClockTick) -> Vec<String> {
        let mut released = Vec::new();
        match &tick.symbol {
            Some(symbol) => {
                if self.release_for(symbol, tick.date) {
                    released.push(symbol.clone());
                }
            }
            None => {
                let symbols: Vec<String> = self.streams.keys().cloned().collect();
                for symbol in symbols {
                    if self.release_for(&symbol, tick.date) {
                        released.push(symbol);
                    }
                }
            }
        }
        released
    }

    fn release_for(&mut self, symbol: &str, date: NaiveDate) -> bool {
        let Some(stream) = self.streams.get_mut(symbol) else {
            debug!(%symbol, "tick for unregistered symbol ignored");
            return false;
        };
        if let Some(valid) = &stream.valid {
            if !valid.contains(&date) {
                return false;
            }
        }
        if stream.released.last().is_some_and(|last| *last >= date) {
            return false;
        }
        stream.released.push(date);
        true
    }

    /// Seed the first MarketEvent for a symbol. Returns the first released
    /// date; the caller resolves `previous_date` through the provider.
    /// No-op once the symbol has started.
    pub fn seed(&mut self, symbol: &str) -> Option<NaiveDate> {
        let stream = self.streams.get_mut(symbol)?;
        if stream.cursor.is_some() || stream.released.is_empty() {
            return None;
        }
        stream.cursor = Some(0);
        Some(stream.released[0])
    }

    /// Advance a started symbol's cursor by one and build the next
    /// MarketEvent, carrying the date just left behind as `previous_date`.
    /// Returns None when no further date has been released.
    pub fn advance(&mut self, symbol: &str) -> Option<MarketEvent> {
        let stream = self.streams.get_mut(symbol)?;
        let cursor = stream.cursor?;
        if cursor + 1 >= stream.released.len() {
            return None;
        }
        stream.cursor = Some(cursor + 1);
        Some(MarketEvent {
            symbol: symbol.to_string(),
            date: stream.released[cursor + 1],
            previous_date: Some(stream.released[cursor]),
        })
    }

    pub fn cursor(&self, symbol: &str) -> Option<usize> {
        self.streams.get(symbol).and_then(|s| s.cursor)
    }

    pub fn released_len(&self, symbol: &str) -> usize {
        self.streams.get(symbol).map_or(0, |s| s.released.len())
    }

    /// Whether a started symbol has consumed every released date.
    pub fn consumed(&self, symbol: &str) -> bool {
        self.streams.get(symbol).map_or(true, |s| s.consumed())
    }

    /// Backtest termination: every symbol fully released and consumed.
    /// Always false for online streams.
    pub fn all_finished(&self) -> bool {
        self.streams
            .values()
            .all(|s| s.fully_released() && s.consumed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn calendar_tick(day: u32) -> ClockTick {
        ClockTick {
            date: d(day),
            symbol: None,
        }
    }

    fn backtest_stream() -> MarketStream {
        let mut valid = HashMap::new();
        valid.insert("SPY".to_string(), vec![d(2), d(3), d(4)]);
        valid.insert("QQQ".to_string(), vec![d(3), d(4)]);
        MarketStream::for_backtest(valid)
    }

    #[test]
    fn calendar_ticks_respect_symbol_membership() {
        let mut stream = backtest_stream();
        // Jan 2: only SPY trades.
        let released = stream.release(&calendar_tick(2));
        assert_eq!(released, vec!["SPY".to_string()]);
        // Jan 3: both trade.
        let mut released = stream.release(&calendar_tick(3));
        released.sort();
        assert_eq!(released, vec!["QQQ".to_string(), "SPY".to_string()]);
    }

    #[test]
    fn seed_then_advance_walks_the_sequence() {
        let mut stream = backtest_stream();
        for day in [2, 3, 4] {
            stream.release(&calendar_tick(day));
        }
        assert_eq!(stream.seed("SPY"), Some(d(2)));
        assert_eq!(stream.cursor("SPY"), Some(0));

        let next = stream.advance("SPY").unwrap();
        assert_eq!(next.date, d(3));
        assert_eq!(next.previous_date, Some(d(2)));
        assert_eq!(stream.cursor("SPY"), Some(1));

        let next = stream.advance("SPY").unwrap();
        assert_eq!(next.date, d(4));
        assert!(stream.advance("SPY").is_none());
        assert_eq!(stream.cursor("SPY"), Some(2));
    }

    #[test]
    fn seed_is_idempotent() {
        let mut stream = backtest_stream();
        stream.release(&calendar_tick(2));
        assert_eq!(stream.seed("SPY"), Some(d(2)));
        assert_eq!(stream.seed("SPY"), None);
    }

    #[test]
    fn all_finished_requires_full_release_and_consumption() {
        let mut stream = backtest_stream();
        stream.release(&calendar_tick(2));
        stream.seed("SPY");
        assert!(!stream.all_finished());

        for day in [3, 4] {
            stream.release(&calendar_tick(day));
        }
        stream.seed("QQQ");
        while stream.advance("SPY").is_some() {}
        while stream.advance("QQQ").is_some() {}
        assert!(stream.all_finished());
    }

    #[test]
    fn online_streams_accept_new_dates_and_never_finish() {
        let symbols = vec!["SPY".to_string()];
        let mut stream = MarketStream::for_online(&symbols);
        let tick = ClockTick {
            date: d(2),
            symbol: Some("SPY".into()),
        };
        assert_eq!(stream.release(&tick), vec!["SPY".to_string()]);
        // Same date again: deduplicated.
        assert!(stream.release(&tick).is_empty());
        assert!(!stream.all_finished());
    }

    #[test]
    fn stale_dates_are_rejected() {
        let symbols = vec!["SPY".to_string()];
        let mut stream = MarketStream::for_online(&symbols);
        stream.release(&ClockTick {
            date: d(5),
            symbol: Some("SPY".into()),
        });
        let stale = stream.release(&ClockTick {
            date: d(3),
            symbol: Some("SPY".into()),
        });
        assert!(stale.is_empty());
        assert_eq!(stream.released_len("SPY"), 1);
    }
}
