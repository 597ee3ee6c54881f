//! Minimal demonstration strategy — buy the strongest close of the day.

use super::Strategy;
use crate::domain::bar::Bar;
use crate::domain::order::Order;
use crate::domain::portfolio::PortfolioSnapshot;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Buys the single highest-priced bar of the day at a fixed target weight.
/// Exists as the second registry entry and as a stateless test fixture.
pub struct SampleMomentumStrategy {
    position_pct: Decimal,
}

impl SampleMomentumStrategy {
    pub fn new(position_pct: Decimal) -> Self {
        Self { position_pct }
    }
}

impl Strategy for SampleMomentumStrategy {
    fn name(&self) -> &str {
        "sample_momentum"
    }

    fn on_bar(
        &mut self,
        _trade_date: NaiveDate,
        bars: &BTreeMap<String, Bar>,
        _portfolio: &PortfolioSnapshot,
    ) -> Vec<Order> {
        let Some(target) = bars.values().max_by(|a, b| a.close.cmp(&b.close)) else {
            return Vec::new();
        };
        vec![Order::buy_target(
            target.symbol.clone(),
            self.position_pct,
            "demo momentum: strongest close of the day",
        )]
    }
}
