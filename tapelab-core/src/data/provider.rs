//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over data sources (in-memory
//! fixtures, a cached store, a live feed) so the engine can swap
//! implementations and tests can run without I/O. Providers sit outside the
//! simulation core: the engine only ever asks for trading dates, bars, and
//! opaque feature records.

use crate::domain::Bar;
use chrono::NaiveDate;
use thiserror::Error;

/// Implementation-defined feature record for one symbol/date, passed through
/// to the strategy untouched.
pub type Features = serde_json::Value;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("no bar for {symbol} on {date}")]
    NoBar { symbol: String, date: NaiveDate },

    #[error("no features for {symbol} on {date}")]
    NoFeatures { symbol: String, date: NaiveDate },
}

impl DataError {
    /// Transient failures are worth retrying; everything else is a fact
    /// about the data that will not change mid-run.
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::Unavailable(_))
    }
}

/// Trait for market data sources.
///
/// All methods are date-addressed; `trading_dates_since` defines the
/// per-symbol calendar the simulation walks.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// The trading date strictly before `date` for this symbol, if any.
    fn previous_trading_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<NaiveDate>, DataError>;

    /// All trading dates for `symbol` on or after `min_date`, ascending.
    fn trading_dates_since(
        &self,
        symbol: &str,
        min_date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, DataError>;

    /// The OHLCV bar for one symbol/date.
    fn bar(&self, symbol: &str, date: NaiveDate) -> Result<Bar, DataError>;

    /// Opaque feature record for one symbol/date (strategy input).
    fn features(&self, symbol: &str, date: NaiveDate) -> Result<Features, DataError>;
}
