//! Position tracking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single open position. Owned exclusively by a `PortfolioSnapshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: Decimal, avg_cost: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_cost,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity <= Decimal::ZERO
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        self.quantity * (price - self.avg_cost)
    }
}
