//! Performance statistics — pure functions over the equity history.
//!
//! Every metric is a pure function: holding history in, scalars out. Calling
//! [`PortfolioStatistics::compute`] twice on the same history returns
//! identical results.

use crate::domain::HoldingSnapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel Sharpe for a zero-volatility, non-zero-return series: large and
/// finite rather than a division by zero.
pub const ZERO_VOL_SHARPE_CAP: f64 = 100.0;

/// One point of the derived equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    /// Raw total equity.
    pub total: f64,
    /// Bar-over-bar percent return (0.0 for the first point).
    pub returns: f64,
    /// Cumulative growth-of-one curve.
    pub curve: f64,
    /// Drawdown from the running peak, as a fraction.
    pub drawdown: f64,
}

/// Summary statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStatistics {
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub drawdown_duration: usize,
    pub equity_curve: Vec<EquityPoint>,
}

impl PortfolioStatistics {
    /// Derive all statistics from the holding history.
    pub fn compute(holdings: &[HoldingSnapshot], periods_per_year: f64) -> Self {
        let totals: Vec<f64> = holdings.iter().map(|h| h.total).collect();
        let returns = pct_returns(&totals);
        let curve = cumulative_curve(&returns);
        let (drawdown, max_drawdown, drawdown_duration) = drawdowns(&curve);

        let total_return_pct = match curve.last() {
            Some(last) => (last - 1.0) * 100.0,
            None => 0.0,
        };

        let equity_curve = holdings
            .iter()
            .enumerate()
            .map(|(i, h)| EquityPoint {
                date: h.date,
                total: h.total,
                returns: returns[i],
                curve: curve[i],
                drawdown: drawdown[i],
            })
            .collect();

        Self {
            total_return_pct,
            sharpe_ratio: sharpe_ratio(&returns[1.min(returns.len())..], periods_per_year),
            max_drawdown,
            drawdown_duration,
            equity_curve,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Bar-over-bar percent change. Same length as the input; the first element
/// is 0.0. A zero previous total also yields 0.0.
pub fn pct_returns(totals: &[f64]) -> Vec<f64> {
    let mut returns = vec![0.0; totals.len()];
    for i in 1..totals.len() {
        let prev = totals[i - 1];
        if prev.abs() > f64::EPSILON {
            returns[i] = totals[i] / prev - 1.0;
        }
    }
    returns
}

/// Cumulative product of (1 + r): the growth-of-one equity curve.
pub fn cumulative_curve(returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len());
    let mut acc = 1.0;
    for r in returns {
        acc *= 1.0 + r;
        curve.push(acc);
    }
    curve
}

/// Annualized Sharpe ratio: mean(returns) / std(returns) × sqrt(periods).
///
/// Zero variance is special-cased: 0.0 for a flat series, the signed
/// [`ZERO_VOL_SHARPE_CAP`] for a constant non-zero return — never NaN or
/// infinity.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std = variance.sqrt();
    if std < 1e-15 {
        if mean.abs() < 1e-15 {
            return 0.0;
        }
        return mean.signum() * ZERO_VOL_SHARPE_CAP;
    }
    (mean / std) * periods_per_year.sqrt()
}

/// Per-point drawdown from the running peak, the maximum drawdown, and the
/// longest contiguous run of points spent in drawdown.
pub fn drawdowns(curve: &[f64]) -> (Vec<f64>, f64, usize) {
    let mut series = Vec::with_capacity(curve.len());
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    let mut longest = 0usize;
    let mut current = 0usize;

    for &eq in curve {
        if eq > peak {
            peak = eq;
        }
        let dd = if peak > 0.0 { 1.0 - eq / peak } else { 0.0 };
        series.push(dd);
        if dd > max_dd {
            max_dd = dd;
        }
        if dd > 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    (series, max_dd, longest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn holdings(totals: &[f64]) -> Vec<HoldingSnapshot> {
        totals
            .iter()
            .enumerate()
            .map(|(i, &total)| HoldingSnapshot {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                cash: total,
                commission: 0.0,
                total,
                market_values: BTreeMap::new(),
            })
            .collect()
    }

    #[test]
    fn pct_returns_basic() {
        let r = pct_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r[0], 0.0);
        assert!((r[1] - 0.10).abs() < 1e-12);
        assert!((r[2] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn curve_compounds() {
        let c = cumulative_curve(&[0.0, 0.10, -0.10]);
        assert!((c[2] - 0.99).abs() < 1e-12);
    }

    #[test]
    fn total_return_from_curve() {
        let stats = PortfolioStatistics::compute(&holdings(&[100.0, 110.0, 121.0]), 252.0);
        assert!((stats.total_return_pct - 21.0).abs() < 1e-9);
    }

    #[test]
    fn sharpe_zero_for_flat_series() {
        assert_eq!(sharpe_ratio(&[0.0, 0.0, 0.0], 252.0), 0.0);
    }

    #[test]
    fn sharpe_constant_returns_is_large_finite() {
        let sharpe = sharpe_ratio(&[0.01, 0.01, 0.01], 252.0);
        assert!(sharpe.is_finite());
        assert_eq!(sharpe, ZERO_VOL_SHARPE_CAP);

        let negative = sharpe_ratio(&[-0.01, -0.01], 252.0);
        assert_eq!(negative, -ZERO_VOL_SHARPE_CAP);
    }

    #[test]
    fn sharpe_is_annualized() {
        // Alternating returns with positive mean.
        let returns = [0.02, -0.01, 0.02, -0.01, 0.02, -0.01];
        let daily = sharpe_ratio(&returns, 1.0);
        let annual = sharpe_ratio(&returns, 252.0);
        assert!((annual - daily * 252.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn drawdown_and_duration() {
        // Peak 1.2, trough 0.9 → max dd = 0.25; 3 points under water.
        let curve = [1.0, 1.2, 1.0, 0.9, 1.1, 1.3];
        let (series, max_dd, duration) = drawdowns(&curve);
        assert_eq!(series[0], 0.0);
        assert!((max_dd - 0.25).abs() < 1e-12);
        assert_eq!(duration, 3);
    }

    #[test]
    fn monotonic_curve_has_no_drawdown() {
        let (_, max_dd, duration) = drawdowns(&[1.0, 1.1, 1.2]);
        assert_eq!(max_dd, 0.0);
        assert_eq!(duration, 0);
    }

    #[test]
    fn statistics_are_idempotent() {
        let rows = holdings(&[100.0, 104.0, 101.0, 108.0]);
        let first = PortfolioStatistics::compute(&rows, 252.0);
        let second = PortfolioStatistics::compute(&rows, 252.0);
        assert_eq!(first, second);
    }
}
