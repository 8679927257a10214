//! In-memory market data provider and synthetic bar generation.
//!
//! `MemoryProvider` backs tests, the CLI demo, and any backtest whose bars
//! were loaded up front. `synthetic_walk` produces a seeded geometric random
//! walk so demo runs are reproducible.

use super::provider::{DataError, Features, MarketDataProvider};
use crate::domain::Bar;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Provider over preloaded bars, keyed by symbol then date.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    bars: HashMap<String, BTreeMap<NaiveDate, Bar>>,
    features: HashMap<String, HashMap<NaiveDate, Features>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one bar. Later inserts for the same symbol/date replace
    /// earlier ones.
    pub fn insert_bar(&mut self, bar: Bar) {
        self.bars
            .entry(bar.symbol.clone())
            .or_default()
            .insert(bar.date, bar);
    }

    pub fn insert_bars(&mut self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            self.insert_bar(bar);
        }
    }

    /// Attach a feature record for one symbol/date.
    pub fn insert_features(&mut self, symbol: &str, date: NaiveDate, features: Features) {
        self.features
            .entry(symbol.to_string())
            .or_default()
            .insert(date, features);
    }

    fn series(&self, symbol: &str) -> Result<&BTreeMap<NaiveDate, Bar>, DataError> {
        self.bars.get(symbol).ok_or_else(|| DataError::UnknownSymbol {
            symbol: symbol.to_string(),
        })
    }
}

impl MarketDataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn previous_trading_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<NaiveDate>, DataError> {
        let series = self.series(symbol)?;
        Ok(series.range(..date).next_back().map(|(d, _)| *d))
    }

    fn trading_dates_since(
        &self,
        symbol: &str,
        min_date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, DataError> {
        let series = self.series(symbol)?;
        Ok(series.range(min_date..).map(|(d, _)| *d).collect())
    }

    fn bar(&self, symbol: &str, date: NaiveDate) -> Result<Bar, DataError> {
        let series = self.series(symbol)?;
        series.get(&date).cloned().ok_or(DataError::NoBar {
            symbol: symbol.to_string(),
            date,
        })
    }

    fn features(&self, symbol: &str, date: NaiveDate) -> Result<Features, DataError> {
        match self.features.get(symbol).and_then(|m| m.get(&date)) {
            Some(features) => Ok(features.clone()),
            // No curated features: fall back to the bar itself as a record,
            // so strategies always have something to read.
            None => {
                let bar = self.bar(symbol, date)?;
                Ok(serde_json::json!({
                    "close": bar.close,
                    "adj_close": bar.adj_close,
                    "volume": bar.volume,
                }))
            }
        }
    }
}

/// Generate a weekday-only geometric random walk of daily bars.
///
/// `drift` and `volatility` are per-day log-space parameters; `seed` makes
/// runs reproducible.
pub fn synthetic_walk(
    symbol: &str,
    start: NaiveDate,
    days: usize,
    start_price: f64,
    drift: f64,
    volatility: f64,
    seed: u64,
) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(days);
    let mut price = start_price;
    let mut date = start;

    while bars.len() < days {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
            continue;
        }
        let shock: f64 = rng.gen_range(-1.0..1.0);
        let ret = drift + volatility * shock;
        let close = (price * (1.0 + ret)).max(0.01);
        let open = price;
        let high = open.max(close) * (1.0 + volatility * 0.25);
        let low = open.min(close) * (1.0 - volatility * 0.25);
        bars.push(Bar {
            symbol: symbol.to_string(),
            date,
            open,
            high,
            low,
            close,
            volume: rng.gen_range(100_000..5_000_000),
            adj_close: close,
        });
        price = close;
        date += Duration::days(1);
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(symbol: &str, date: NaiveDate, close: f64) -> Bar {
        Bar {
            symbol: symbol.into(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
            adj_close: close,
        }
    }

    #[test]
    fn dates_are_ascending_from_min() {
        let mut provider = MemoryProvider::new();
        provider.insert_bars([
            bar("SPY", d(2), 100.0),
            bar("SPY", d(3), 101.0),
            bar("SPY", d(4), 102.0),
        ]);
        let dates = provider.trading_dates_since("SPY", d(3)).unwrap();
        assert_eq!(dates, vec![d(3), d(4)]);
    }

    #[test]
    fn previous_trading_date_skips_gaps() {
        let mut provider = MemoryProvider::new();
        provider.insert_bars([bar("SPY", d(2), 100.0), bar("SPY", d(5), 101.0)]);
        assert_eq!(
            provider.previous_trading_date("SPY", d(5)).unwrap(),
            Some(d(2))
        );
        assert_eq!(provider.previous_trading_date("SPY", d(2)).unwrap(), None);
    }

    #[test]
    fn missing_bar_is_an_error() {
        let mut provider = MemoryProvider::new();
        provider.insert_bar(bar("SPY", d(2), 100.0));
        assert!(matches!(
            provider.bar("SPY", d(3)),
            Err(DataError::NoBar { .. })
        ));
        assert!(matches!(
            provider.bar("QQQ", d(2)),
            Err(DataError::UnknownSymbol { .. })
        ));
    }

    #[test]
    fn default_features_mirror_the_bar() {
        let mut provider = MemoryProvider::new();
        provider.insert_bar(bar("SPY", d(2), 100.0));
        let features = provider.features("SPY", d(2)).unwrap();
        assert_eq!(features["close"], 100.0);
    }

    #[test]
    fn synthetic_walk_is_reproducible_and_sane() {
        let a = synthetic_walk("SPY", d(1), 50, 100.0, 0.0005, 0.01, 7);
        let b = synthetic_walk("SPY", d(1), 50, 100.0, 0.0005, 0.01, 7);
        assert_eq!(a.len(), 50);
        assert_eq!(a, b);
        assert!(a.iter().all(|bar| bar.is_sane()));
        // Weekends are skipped
        assert!(a
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }
}
