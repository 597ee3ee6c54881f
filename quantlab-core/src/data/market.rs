//! MarketData — per-date bar maps assembled from per-symbol series.

use crate::domain::bar::Bar;
use crate::domain::series::BarSeries;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// All bars for a backtest window, keyed date → symbol → bar.
///
/// Symbol keys are unique per date by construction (one series per symbol,
/// strictly increasing dates within a series). `BTreeMap` keys give
/// deterministic iteration order everywhere the engine walks a day's bars.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    bars_by_date: BTreeMap<NaiveDate, BTreeMap<String, Bar>>,
    prev_close: BTreeMap<NaiveDate, BTreeMap<String, Decimal>>,
    symbols: BTreeSet<String>,
}

impl MarketData {
    /// Assemble from per-symbol series.
    ///
    /// The previous-close map feeds momentum scoring; a symbol's first bar
    /// uses its own close (zero momentum, not a phantom jump).
    pub fn from_series<I: IntoIterator<Item = BarSeries>>(series: I) -> Self {
        let mut data = MarketData::default();
        for s in series {
            let symbol = s.symbol().to_string();
            if s.is_empty() {
                continue;
            }
            data.symbols.insert(symbol.clone());
            let mut prev: Option<Decimal> = None;
            for bar in s.bars() {
                data.prev_close
                    .entry(bar.trade_date)
                    .or_default()
                    .insert(symbol.clone(), prev.unwrap_or(bar.close));
                prev = Some(bar.close);
                data.bars_by_date
                    .entry(bar.trade_date)
                    .or_default()
                    .insert(symbol.clone(), bar.clone());
            }
        }
        debug!(
            symbols = data.symbols.len(),
            dates = data.bars_by_date.len(),
            "assembled market data"
        );
        data
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars_by_date.keys().copied()
    }

    pub fn bars_on(&self, date: NaiveDate) -> Option<&BTreeMap<String, Bar>> {
        self.bars_by_date.get(&date)
    }

    pub fn prev_closes_on(&self, date: NaiveDate) -> Option<&BTreeMap<String, Decimal>> {
        self.prev_close.get(&date)
    }

    pub fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.bars_by_date.is_empty()
    }

    pub fn date_count(&self) -> usize {
        self.bars_by_date.len()
    }

    pub fn bar_count(&self) -> usize {
        self.bars_by_date.values().map(|m| m.len()).sum()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars_by_date.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars_by_date.keys().next_back().copied()
    }
}
