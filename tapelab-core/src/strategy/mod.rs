//! Strategy seam — how the engine asks for trading signals.
//!
//! The engine hands the strategy the market event plus a view of the last
//! completed bar and the provider's feature record; the strategy answers
//! with at most one signal. Strategies never see the portfolio — sizing and
//! position awareness live in the ledger's order-generation policy.

pub mod ma_cross;

use crate::data::Features;
use crate::domain::{Bar, MarketEvent, SignalEvent};

pub use ma_cross::MaCrossStrategy;

/// Market data as of the event's previous (completed) trading date.
///
/// Either field can be absent: the first event of a symbol's history has no
/// previous bar, and a degraded provider tick has no data at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketData<'a> {
    pub bar: Option<&'a Bar>,
    pub features: Option<&'a Features>,
}

/// A pluggable signal generator.
pub trait Strategy: Send {
    /// Identifier stamped onto emitted signals.
    fn strategy_id(&self) -> u32;

    /// React to a market update. `None` means no opinion this tick.
    fn calculate_signals(
        &mut self,
        event: &MarketEvent,
        data: &MarketData<'_>,
    ) -> Option<SignalEvent>;
}
