//! Watchlist momentum plan — score held symbols against live data.
//!
//! Reuses the backtest indicators outside the simulation loop: for each
//! watchlist entry, fetch a recent OHLCV window through the injected
//! provider, test breakout and trend-break conditions, consult the regime
//! classifier, and report a per-symbol action with a regime-scaled target
//! weight. Read-only — nothing here mutates a portfolio.

use crate::data::provider::{BarProvider, DataError};
use crate::domain::regime::Regime;
use crate::indicators::{ema, macd, rsi};
use crate::regime::classifier::RegimeClassifier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Bars fetched per symbol.
const LOOKBACK_DAYS: usize = 120;
/// Minimum bars required to evaluate a symbol.
const MIN_BARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    /// Current portfolio weight, 0.0–1.0.
    pub position_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingAction {
    Exit,
    BuyAdd,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub symbol: String,
    pub as_of: Option<NaiveDate>,
    pub regime: Regime,
    pub current_pct: f64,
    pub breakout_ok: bool,
    pub sell_ok: bool,
    pub action: HoldingAction,
    pub reason: String,
    pub target_pct: f64,
    pub missing_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumSummary {
    /// Most common regime across evaluable rows.
    pub regime: Option<Regime>,
    pub total_current_pct: f64,
    pub total_target_pct: f64,
}

/// The full plan: summary, positive-target holdings, and every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumPlan {
    pub summary: MomentumSummary,
    pub holdings: Vec<HoldingRow>,
    pub rows: Vec<HoldingRow>,
}

fn regime_target(regime: Regime) -> f64 {
    match regime {
        Regime::Strong => 0.25,
        Regime::Diverging => 0.15,
        Regime::Weak | Regime::Unknown => 0.05,
    }
}

fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

fn missing_row(symbol: &str, current_pct: f64, marker: &str) -> HoldingRow {
    HoldingRow {
        symbol: symbol.to_string(),
        as_of: None,
        regime: Regime::Unknown,
        current_pct: round4(current_pct),
        breakout_ok: false,
        sell_ok: false,
        action: HoldingAction::Hold,
        reason: "missing_data".to_string(),
        target_pct: round4(current_pct),
        missing_data: vec![marker.to_string()],
    }
}

fn compute_rows(
    entries: &[WatchlistEntry],
    provider: &dyn BarProvider,
    classifier: &RegimeClassifier,
) -> Vec<HoldingRow> {
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let symbol = entry.symbol.trim();
        if symbol.is_empty() {
            continue;
        }
        let current_pct = entry.position_pct.clamp(0.0, 1.0);

        let series = match provider.recent_bars(symbol, LOOKBACK_DAYS) {
            Ok(series) => series,
            Err(err) => {
                debug!(%symbol, %err, "watchlist symbol not evaluable");
                let marker = match err {
                    DataError::SymbolNotFound(_) => "unknown_symbol",
                    _ => "no_bars",
                };
                rows.push(missing_row(symbol, current_pct, marker));
                continue;
            }
        };
        let closes = series.closes();
        if closes.len() < MIN_BARS {
            rows.push(missing_row(symbol, current_pct, "insufficient_bars"));
            continue;
        }
        let highs = series.highs();
        let vols = series.volumes();
        let n = closes.len();
        let close = closes[n - 1];
        let as_of = series.last().map(|b| b.trade_date);

        let ema20 = *ema(&closes, 20).last().unwrap();
        let ema30 = *ema(&closes, 30).last().unwrap();
        let (macd_line, _signal, hist) = macd(&closes, 12, 26, 9);
        let macd_last = *macd_line.last().unwrap();
        let hist_last = *hist.last().unwrap();
        let rsi14 = rsi(&closes, 14).last().copied().unwrap_or(50.0);
        let high20 = highs[n - 20..].iter().fold(f64::MIN, |a, &b| a.max(b));
        let vol_ma20 = vols[n - 20..].iter().sum::<f64>() / 20.0;
        let vol_ok = vol_ma20 > 0.0 && vols[n - 1] > vol_ma20 * 1.2;

        let breakout_ok = close >= 0.99 * high20
            && ema20 > ema30
            && hist_last > 0.0
            && (55.0..=82.0).contains(&rsi14)
            && vol_ok;
        let sell_ok = close < ema20 * 0.98 || macd_last < 0.0;

        let regime = classifier.classify(as_of).regime;
        let (action, reason, target_pct) = if sell_ok {
            (HoldingAction::Exit, "trend_weak", 0.0)
        } else if breakout_ok {
            (HoldingAction::BuyAdd, "breakout", regime_target(regime))
        } else {
            (HoldingAction::Hold, "no_action", current_pct)
        };

        rows.push(HoldingRow {
            symbol: symbol.to_string(),
            as_of,
            regime,
            current_pct: round4(current_pct),
            breakout_ok,
            sell_ok,
            action,
            reason: reason.to_string(),
            target_pct: round4(target_pct),
            missing_data: Vec::new(),
        });
    }
    rows
}

/// Build the structured plan for a watchlist.
pub fn compute_watchlist_momentum_plan(
    entries: &[WatchlistEntry],
    provider: &dyn BarProvider,
    classifier: &RegimeClassifier,
) -> MomentumPlan {
    let rows = compute_rows(entries, provider, classifier);

    let mut total_current = 0.0;
    let mut total_target = 0.0;
    let mut regime_counts: BTreeMap<String, (Regime, usize)> = BTreeMap::new();
    let mut holdings: Vec<HoldingRow> = Vec::new();
    for row in &rows {
        if !row.missing_data.is_empty() {
            continue;
        }
        total_current += row.current_pct;
        total_target += row.target_pct;
        let key = format!("{:?}", row.regime);
        regime_counts.entry(key).or_insert((row.regime, 0)).1 += 1;
        if row.target_pct > 0.0 {
            holdings.push(row.clone());
        }
    }
    holdings.sort_by(|a, b| {
        b.target_pct
            .partial_cmp(&a.target_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    let dominant_regime = regime_counts
        .values()
        .max_by_key(|(_, count)| *count)
        .map(|(regime, _)| *regime);

    MomentumPlan {
        summary: MomentumSummary {
            regime: dominant_regime,
            total_current_pct: round4(total_current),
            total_target_pct: round4(total_target),
        },
        holdings,
        rows,
    }
}
