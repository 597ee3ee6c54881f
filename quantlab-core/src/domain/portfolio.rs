//! PortfolioSnapshot — cash plus open positions at one instant.

use super::position::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate portfolio state.
///
/// The accounting identity must hold whenever a snapshot leaves the engine:
/// `equity == cash + sum(position market values at last known close)`.
/// Cash never goes negative — orders that do not fit are rejected upstream,
/// not clipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub equity: Decimal,
    pub positions: BTreeMap<String, Position>,
}

impl PortfolioSnapshot {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            cash: initial_cash,
            equity: initial_cash,
            positions: BTreeMap::new(),
        }
    }

    /// Sum of position market values at the given prices.
    ///
    /// A symbol with no quoted price is carried at its average cost — the
    /// engine always supplies last-known closes, so this only matters for
    /// snapshots inspected outside a run.
    pub fn position_value(&self, prices: &BTreeMap<String, Decimal>) -> Decimal {
        self.positions
            .values()
            .map(|pos| {
                let price = prices.get(&pos.symbol).copied().unwrap_or(pos.avg_cost);
                pos.market_value(price)
            })
            .sum()
    }

    /// Recompute `equity` from cash and current prices.
    pub fn recompute_equity(&mut self, prices: &BTreeMap<String, Decimal>) {
        self.equity = self.cash + self.position_value(prices);
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.get(symbol).is_some_and(|p| !p.is_flat())
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol).filter(|p| !p.is_flat())
    }
}
