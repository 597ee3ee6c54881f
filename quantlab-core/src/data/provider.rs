//! Data provider trait and structured error types.
//!
//! Implementations wrap vendor adapters (tushare/akshare-style) or test
//! fixtures. The provider guarantees chronological order and unique dates —
//! `BarSeries` enforces both — and signals a missing session by omission,
//! never by a zero-filled bar.

use crate::domain::series::BarSeries;
use std::collections::BTreeMap;
use thiserror::Error;

/// Structured errors for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("no bars for {symbol} in the requested window")]
    NoData { symbol: String },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("invalid bar series: {0}")]
    InvalidSeries(String),
}

/// Read-only access to recent bar history, injected into the live paths.
pub trait BarProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// The last `days` daily bars for a symbol, oldest first.
    fn recent_bars(&self, symbol: &str, days: usize) -> Result<BarSeries, DataError>;
}

/// Provider over pre-loaded series — tests, offline runs, CLI CSV ingest.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    series: BTreeMap<String, BarSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_series<I: IntoIterator<Item = BarSeries>>(series: I) -> Self {
        let mut provider = Self::new();
        for s in series {
            provider.insert(s);
        }
        provider
    }

    pub fn insert(&mut self, series: BarSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|s| s.as_str())
    }
}

impl BarProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn recent_bars(&self, symbol: &str, days: usize) -> Result<BarSeries, DataError> {
        let series = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        if series.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(series.tail(days))
    }
}
