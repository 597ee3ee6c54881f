//! Order — a strategy's buy/sell instruction with an audit reason.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
}

/// Either an explicit share count or a target portfolio weight.
///
/// Target weights are resolved by the engine against pre-order equity;
/// `TargetPct(0)` means "flatten the position".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSize {
    Quantity(Decimal),
    TargetPct(Decimal),
}

/// A transient instruction produced by a strategy for one trade date.
///
/// `reason` is free text for auditability and is carried through to the trade
/// and rejection logs — it is never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub symbol: String,
    pub action: OrderAction,
    pub size: OrderSize,
    pub reason: String,
}

impl Order {
    pub fn buy_qty(symbol: impl Into<String>, quantity: Decimal, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action: OrderAction::Buy,
            size: OrderSize::Quantity(quantity),
            reason: reason.into(),
        }
    }

    pub fn sell_qty(symbol: impl Into<String>, quantity: Decimal, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action: OrderAction::Sell,
            size: OrderSize::Quantity(quantity),
            reason: reason.into(),
        }
    }

    pub fn buy_target(symbol: impl Into<String>, pct: Decimal, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action: OrderAction::Buy,
            size: OrderSize::TargetPct(pct),
            reason: reason.into(),
        }
    }

    /// Flatten the position (target weight zero).
    pub fn exit(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action: OrderAction::Sell,
            size: OrderSize::TargetPct(Decimal::ZERO),
            reason: reason.into(),
        }
    }
}
