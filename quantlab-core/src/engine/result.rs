//! Backtest output types — equity curve, logs, and summary.

use crate::domain::order::{OrderAction, OrderSize};
use crate::fingerprint::RunFingerprint;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One point of the equity curve — the recorded portfolio copy for a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: Decimal,
    pub equity: Decimal,
    /// Fraction below the running equity peak (0.0 or negative).
    pub drawdown: f64,
    /// Fraction of equity held in positions.
    pub invested_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Executed,
    Rejected,
    Skipped,
}

/// Disposition of one strategy order in the daily log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub symbol: String,
    pub action: OrderAction,
    pub size: OrderSize,
    pub status: OrderStatus,
    /// The strategy's own reason for the order.
    pub reason: String,
    /// Engine-side disposition detail (rejection cause, skip cause).
    pub detail: Option<String>,
    pub exec_quantity: Option<Decimal>,
    pub exec_price: Option<Decimal>,
}

/// An executed fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub action: OrderAction,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub cash_after: Decimal,
    pub reason: String,
}

/// An order the engine refused, with both sides of the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedOrder {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub action: OrderAction,
    pub size: OrderSize,
    /// The strategy's reason for wanting the order.
    pub order_reason: String,
    /// Why the engine refused it.
    pub reject_reason: String,
}

/// One row of the day's candidate ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCandidate {
    pub symbol: String,
    pub score: f64,
    pub close: Decimal,
}

/// Everything that happened on one simulated date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub selected: Vec<SelectedCandidate>,
    pub orders: Vec<OrderRecord>,
    pub positions: BTreeMap<String, Decimal>,
    pub cash: Decimal,
    pub equity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub total_rejections: usize,
    pub final_equity: Decimal,
}

/// Terminal state of a run. Fully determined by params + data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub summary: Summary,
    pub equity_curve: Vec<EquityPoint>,
    pub daily_log: Vec<DailyRecord>,
    pub trades: Vec<TradeRecord>,
    pub rejections: Vec<RejectedOrder>,
    pub fingerprint: RunFingerprint,
}
