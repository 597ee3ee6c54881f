//! Trend evaluator value types.

use super::regime::Regime;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed set of buy patterns the trend evaluator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyMode {
    /// Breakout followed by a pullback to support.
    #[serde(rename = "A_pullback")]
    APullback,
    /// Momentum new-high inside an established trend.
    #[serde(rename = "B_momentum")]
    BMomentum,
    #[serde(rename = "none")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyAction {
    Buy,
    Wait,
    Avoid,
}

/// Boolean trend checks; `None` means the check lacked history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendChecks {
    pub ema_order: Option<bool>,
    pub macd_positive: Option<bool>,
    pub macd_hist_expanding: Option<bool>,
    pub close_near_20d_high: Option<bool>,
    pub rsi_in_range: Option<bool>,
    pub volume_ok: Option<bool>,
}

impl TrendChecks {
    pub fn all_present(&self) -> bool {
        self.ema_order.is_some()
            && self.macd_positive.is_some()
            && self.macd_hist_expanding.is_some()
            && self.close_near_20d_high.is_some()
            && self.rsi_in_range.is_some()
            && self.volume_ok.is_some()
    }

    /// Conjunction of all checks, or `None` when any lacks history.
    pub fn verdict(&self) -> Option<bool> {
        if !self.all_present() {
            return None;
        }
        Some(
            self.ema_order.unwrap_or(false)
                && self.macd_positive.unwrap_or(false)
                && self.macd_hist_expanding.unwrap_or(false)
                && self.close_near_20d_high.unwrap_or(false)
                && self.rsi_in_range.unwrap_or(false)
                && self.volume_ok.unwrap_or(false),
        )
    }
}

/// Stop-loss derivation: final price plus the named parts that produced it,
/// and the exit/warn overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopLossReport {
    pub price: Option<f64>,
    pub exit_now: bool,
    pub exit_reasons: Vec<String>,
    pub warn_reduce_half: bool,
    pub warn_reasons: Vec<String>,
    pub parts: BTreeMap<String, f64>,
}

/// The buy-side decision with its diagnostic trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyAdvice {
    pub mode: BuyMode,
    pub action: BuyAction,
    /// Reason string — never empty when `action` is not `Buy`.
    pub why: String,
    pub zone_low: Option<f64>,
    pub zone_high: Option<f64>,
    pub ref_price: Option<f64>,
    pub in_trend: bool,
    pub mode_b_allowed: bool,
    pub breakout_level: Option<f64>,
    /// Sessions back (1-based, excluding today) of the qualifying breakout day.
    pub breakout_offset: Option<usize>,
    pub support: Option<f64>,
    pub pullback_signal: Option<bool>,
}

impl Default for BuyAdvice {
    fn default() -> Self {
        Self {
            mode: BuyMode::None,
            action: BuyAction::Wait,
            why: String::new(),
            zone_low: None,
            zone_high: None,
            ref_price: None,
            in_trend: false,
            mode_b_allowed: false,
            breakout_level: None,
            breakout_offset: None,
            support: None,
            pullback_signal: None,
        }
    }
}

/// Full output of the trend evaluator for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub symbol: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub as_of: Option<NaiveDate>,
    pub market_regime: Regime,
    /// Conjunction of `checks`, `None` with insufficient indicators.
    pub trend_ok: Option<bool>,
    pub checks: TrendChecks,
    /// Composite 0–100 score; `None` when inputs are missing.
    pub score: Option<f64>,
    pub score_parts: BTreeMap<String, f64>,
    /// Industry-flow adjustment tags applied to the score, if any.
    pub flow_reasons: Vec<String>,
    pub stop_loss: StopLossReport,
    pub buy: BuyAdvice,
    pub missing_data: Vec<String>,
}

/// Distilled decision view of a `TrendReport` — what callers act on.
///
/// This is a report, not an order: `sell_signal` mirrors the evaluator's
/// exit-now override, and `buy_reason` is always non-empty when no trade is
/// signaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDecision {
    pub symbol: String,
    pub buy_mode: BuyMode,
    pub buy_action: BuyAction,
    pub buy_reason: String,
    pub sell_signal: bool,
    pub sell_reasons: Vec<String>,
}

impl From<&TrendReport> for TrendDecision {
    fn from(report: &TrendReport) -> Self {
        Self {
            symbol: report.symbol.clone(),
            buy_mode: report.buy.mode,
            buy_action: report.buy.action,
            buy_reason: report.buy.why.clone(),
            sell_signal: report.stop_loss.exit_now,
            sell_reasons: report.stop_loss.exit_reasons.clone(),
        }
    }
}
