//! Portfolio — the single-writer position/holding ledger.
//!
//! One ledger serves both backtest and online runs; modes differ only in the
//! clock and provider collaborators wired around it. Only the engine loop
//! mutates it; statistics and persistence read it.
//!
//! The equity accounting identity must hold after every market or fill
//! application: `total == cash + sum(symbol market values)`.

use crate::domain::{
    Direction, FillEvent, HoldingSnapshot, MarketEvent, OrderEvent, OrderType, PositionSnapshot,
    SignalEvent, SignalKind,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Tolerance for equity identity checks.
pub const IDENTITY_TOLERANCE: f64 = 1e-6;

/// Serializable full state of a [`Portfolio`] — the persisted document and
/// the restore point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub portfolio_id: String,
    pub symbols: Vec<String>,
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    pub lot_size: u32,
    pub current_positions: BTreeMap<String, i64>,
    pub current_holding: HoldingSnapshot,
    pub all_positions: Vec<PositionSnapshot>,
    pub all_holdings: Vec<HoldingSnapshot>,
}

/// The portfolio ledger.
#[derive(Debug, Clone)]
pub struct Portfolio {
    portfolio_id: String,
    symbols: Vec<String>,
    initial_capital: f64,
    start_date: NaiveDate,
    /// Whole lots for naive entry sizing.
    lot_size: u32,
    current_positions: BTreeMap<String, i64>,
    current_holding: HoldingSnapshot,
    all_positions: Vec<PositionSnapshot>,
    all_holdings: Vec<HoldingSnapshot>,
}

impl Portfolio {
    pub fn new(
        portfolio_id: impl Into<String>,
        symbols: Vec<String>,
        start_date: NaiveDate,
        initial_capital: f64,
        lot_size: u32,
    ) -> Self {
        let current_positions: BTreeMap<String, i64> =
            symbols.iter().map(|s| (s.clone(), 0)).collect();
        let current_holding = HoldingSnapshot::initial(start_date, &symbols, initial_capital);
        Self {
            portfolio_id: portfolio_id.into(),
            all_positions: vec![PositionSnapshot::flat(start_date, &symbols)],
            all_holdings: vec![current_holding.clone()],
            current_positions,
            current_holding,
            symbols,
            initial_capital,
            start_date,
            lot_size,
        }
    }

    pub fn portfolio_id(&self) -> &str {
        &self.portfolio_id
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.current_holding.cash
    }

    pub fn total_equity(&self) -> f64 {
        self.current_holding.total
    }

    pub fn commission_accrued(&self) -> f64 {
        self.current_holding.commission
    }

    /// Current signed position for a symbol (0 if unknown).
    pub fn position(&self, symbol: &str) -> i64 {
        self.current_positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn position_history(&self) -> &[PositionSnapshot] {
        &self.all_positions
    }

    pub fn holding_history(&self) -> &[HoldingSnapshot] {
        &self.all_holdings
    }

    /// Mark to market: append position and holding snapshots for the event's
    /// date, carrying cash and commission forward and revaluing every symbol
    /// at its last known price.
    pub fn apply_market(&mut self, event: &MarketEvent, prices: &HashMap<String, f64>) {
        let position_row = PositionSnapshot {
            date: event.date,
            positions: self.current_positions.clone(),
        };
        self.all_positions.push(position_row);

        let mut holding_row = HoldingSnapshot {
            date: event.date,
            cash: self.current_holding.cash,
            commission: self.current_holding.commission,
            total: 0.0,
            market_values: BTreeMap::new(),
        };
        for symbol in &self.symbols {
            let position = self.position(symbol);
            let price = prices.get(symbol).copied().unwrap_or(0.0);
            holding_row
                .market_values
                .insert(symbol.clone(), position as f64 * price);
        }
        holding_row.recompute_total();
        self.current_holding = holding_row.clone();
        self.all_holdings.push(holding_row);
    }

    /// Apply a fill: mutate the current position and holding, and patch the
    /// matching history rows for the fill's date if they were already
    /// appended (the mark-to-market snapshot for "today" may precede the
    /// fill for "today").
    pub fn apply_fill(&mut self, fill: &FillEvent) {
        let sign = fill.direction.sign();
        let quantity = fill.quantity as i64;
        let delta_position = sign * quantity;
        let cost = sign as f64 * fill.fill_cost * quantity as f64;

        *self
            .current_positions
            .entry(fill.symbol.clone())
            .or_insert(0) += delta_position;

        self.current_holding.cash -= cost + fill.commission;
        self.current_holding.commission += fill.commission;
        *self
            .current_holding
            .market_values
            .entry(fill.symbol.clone())
            .or_insert(0.0) += cost;
        self.current_holding.recompute_total();

        if let Some(row) = self
            .all_positions
            .iter_mut()
            .rev()
            .find(|row| row.date == fill.date)
        {
            *row.positions.entry(fill.symbol.clone()).or_insert(0) += delta_position;
        }
        if let Some(row) = self
            .all_holdings
            .iter_mut()
            .rev()
            .find(|row| row.date == fill.date)
        {
            row.cash -= cost + fill.commission;
            row.commission += fill.commission;
            *row.market_values.entry(fill.symbol.clone()).or_insert(0.0) += cost;
            row.recompute_total();
        }
    }

    /// Naive sizing policy: turn a signal into at most one market order.
    ///
    /// - `Up` with a flat book buys as many whole lots as cash allows at the
    ///   last known price.
    /// - `Down` with a long position sells the whole position.
    /// - `Exit` closes whatever is open, long or short.
    /// - `Hold`, or a signal with no enabling condition, is an explicit
    ///   no-op.
    pub fn generate_order(
        &self,
        signal: &SignalEvent,
        prices: &HashMap<String, f64>,
    ) -> Option<OrderEvent> {
        let position = self.position(&signal.symbol);

        let (quantity, direction) = match signal.signal {
            SignalKind::Up if position == 0 => {
                let price = prices.get(&signal.symbol).copied()?;
                if price <= 0.0 || self.lot_size == 0 {
                    return None;
                }
                let lot_cost = price * self.lot_size as f64;
                let lots = (self.current_holding.cash / lot_cost).floor() as u32;
                let quantity = lots.saturating_mul(self.lot_size);
                if quantity == 0 {
                    debug!(symbol = %signal.symbol, "insufficient cash for one lot");
                    return None;
                }
                (quantity, Direction::Buy)
            }
            SignalKind::Down if position > 0 => (position as u32, Direction::Sell),
            SignalKind::Exit if position > 0 => (position as u32, Direction::Sell),
            SignalKind::Exit if position < 0 => (position.unsigned_abs() as u32, Direction::Buy),
            _ => return None,
        };

        Some(OrderEvent {
            symbol: signal.symbol.clone(),
            date: signal.date,
            order_type: OrderType::Market,
            quantity,
            direction,
        })
    }

    /// Whether the equity identity holds for the current holding.
    pub fn identity_holds(&self) -> bool {
        self.current_holding.identity_holds(IDENTITY_TOLERANCE)
    }

    /// Serializable full state.
    pub fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            portfolio_id: self.portfolio_id.clone(),
            symbols: self.symbols.clone(),
            initial_capital: self.initial_capital,
            start_date: self.start_date,
            lot_size: self.lot_size,
            current_positions: self.current_positions.clone(),
            current_holding: self.current_holding.clone(),
            all_positions: self.all_positions.clone(),
            all_holdings: self.all_holdings.clone(),
        }
    }

    /// Rebuild a ledger from a snapshot.
    pub fn restore(snapshot: PortfolioSnapshot) -> Self {
        Self {
            portfolio_id: snapshot.portfolio_id,
            symbols: snapshot.symbols,
            initial_capital: snapshot.initial_capital,
            start_date: snapshot.start_date,
            lot_size: snapshot.lot_size,
            current_positions: snapshot.current_positions,
            current_holding: snapshot.current_holding,
            all_positions: snapshot.all_positions,
            all_holdings: snapshot.all_holdings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketEvent;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn portfolio() -> Portfolio {
        Portfolio::new("test", vec!["SPY".to_string()], d(1), 100_000.0, 100)
    }

    fn market_event(day: u32) -> MarketEvent {
        MarketEvent {
            symbol: "SPY".into(),
            date: d(day),
            previous_date: Some(d(day - 1)),
        }
    }

    fn buy_fill(day: u32, quantity: u32, price: f64, commission: f64) -> FillEvent {
        FillEvent {
            symbol: "SPY".into(),
            date: d(day),
            quantity,
            direction: Direction::Buy,
            fill_cost: price,
            commission,
            venue: "simulated".into(),
        }
    }

    fn signal(kind: SignalKind, day: u32) -> SignalEvent {
        SignalEvent {
            symbol: "SPY".into(),
            date: d(day),
            strategy_id: 1,
            signal: kind,
            strength: None,
        }
    }

    #[test]
    fn starts_with_opening_rows() {
        let p = portfolio();
        assert_eq!(p.position_history().len(), 1);
        assert_eq!(p.holding_history().len(), 1);
        assert_eq!(p.total_equity(), 100_000.0);
        assert!(p.identity_holds());
    }

    #[test]
    fn apply_market_appends_and_revalues() {
        let mut p = portfolio();
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 100.0);
        p.apply_market(&market_event(2), &prices);
        assert_eq!(p.holding_history().len(), 2);
        // Flat book: equity unchanged.
        assert_eq!(p.total_equity(), 100_000.0);
        assert!(p.identity_holds());
    }

    #[test]
    fn fill_cash_arithmetic_is_exact() {
        let mut p = portfolio();
        let cash_before = p.cash();
        p.apply_fill(&buy_fill(2, 100, 250.0, 1.3));
        assert_eq!(p.cash(), cash_before - (250.0 * 100.0 + 1.3));
        assert_eq!(p.position("SPY"), 100);
        assert_eq!(p.commission_accrued(), 1.3);
        assert!(p.identity_holds());
    }

    #[test]
    fn sell_fill_reverses_sign() {
        let mut p = portfolio();
        p.apply_fill(&buy_fill(2, 100, 250.0, 0.0));
        let cash_before = p.cash();
        let mut sell = buy_fill(3, 40, 260.0, 1.0);
        sell.direction = Direction::Sell;
        p.apply_fill(&sell);
        assert_eq!(p.position("SPY"), 60);
        assert_eq!(p.cash(), cash_before + 260.0 * 40.0 - 1.0);
        assert!(p.identity_holds());
    }

    #[test]
    fn fill_patches_same_date_history_rows() {
        let mut p = portfolio();
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 250.0);
        // Mark-to-market for day 2 lands before the day-2 fill.
        p.apply_market(&market_event(2), &prices);
        p.apply_fill(&buy_fill(2, 100, 250.0, 1.3));

        let position_row = p.position_history().last().unwrap();
        assert_eq!(position_row.date, d(2));
        assert_eq!(position_row.positions["SPY"], 100);

        let holding_row = p.holding_history().last().unwrap();
        assert_eq!(holding_row.date, d(2));
        assert_eq!(holding_row.market_values["SPY"], 25_000.0);
        assert!(holding_row.identity_holds(IDENTITY_TOLERANCE));
    }

    #[test]
    fn fill_for_earlier_date_leaves_later_rows_alone() {
        let mut p = portfolio();
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 250.0);
        p.apply_market(&market_event(2), &prices);
        p.apply_market(&market_event(3), &prices);
        p.apply_fill(&buy_fill(2, 10, 250.0, 0.0));

        let day2 = &p.position_history()[1];
        let day3 = &p.position_history()[2];
        assert_eq!(day2.positions["SPY"], 10);
        assert_eq!(day3.positions["SPY"], 0);
        // Current state reflects the fill regardless.
        assert_eq!(p.position("SPY"), 10);
    }

    #[test]
    fn up_signal_buys_whole_lots_within_cash() {
        let p = Portfolio::new("test", vec!["SPY".to_string()], d(1), 1_000.0, 10);
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 30.0);
        // One lot costs 300; cash 1000 → 3 lots = 30 shares.
        let order = p.generate_order(&signal(SignalKind::Up, 2), &prices).unwrap();
        assert_eq!(order.quantity, 30);
        assert_eq!(order.direction, Direction::Buy);
        assert!(order.quantity as f64 * 30.0 <= 1_000.0);
    }

    #[test]
    fn up_signal_with_open_position_is_noop() {
        let mut p = portfolio();
        p.apply_fill(&buy_fill(2, 100, 100.0, 0.0));
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 100.0);
        assert!(p.generate_order(&signal(SignalKind::Up, 3), &prices).is_none());
    }

    #[test]
    fn down_signal_sells_everything() {
        let mut p = portfolio();
        p.apply_fill(&buy_fill(2, 70, 100.0, 0.0));
        let prices = HashMap::new();
        let order = p
            .generate_order(&signal(SignalKind::Down, 3), &prices)
            .unwrap();
        assert_eq!(order.quantity, 70);
        assert_eq!(order.direction, Direction::Sell);
    }

    #[test]
    fn exit_signal_closes_a_short_with_a_buy() {
        let mut p = portfolio();
        let mut sell = buy_fill(2, 50, 100.0, 0.0);
        sell.direction = Direction::Sell;
        p.apply_fill(&sell);
        assert_eq!(p.position("SPY"), -50);

        let prices = HashMap::new();
        let order = p
            .generate_order(&signal(SignalKind::Exit, 3), &prices)
            .unwrap();
        assert_eq!(order.quantity, 50);
        assert_eq!(order.direction, Direction::Buy);
    }

    #[test]
    fn hold_signal_is_noop() {
        let p = portfolio();
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 100.0);
        assert!(p.generate_order(&signal(SignalKind::Hold, 2), &prices).is_none());
    }

    #[test]
    fn snapshot_roundtrip_reproduces_state() {
        let mut p = portfolio();
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 250.0);
        p.apply_market(&market_event(2), &prices);
        p.apply_fill(&buy_fill(2, 100, 250.0, 1.3));

        let json = serde_json::to_string(&p.snapshot()).unwrap();
        let restored = Portfolio::restore(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.position("SPY"), p.position("SPY"));
        assert_eq!(restored.cash(), p.cash());
        assert_eq!(restored.total_equity(), p.total_equity());
        assert_eq!(restored.holding_history(), p.holding_history());
        assert_eq!(restored.position_history(), p.position_history());
    }
}
