//! BarSeries — one symbol's chronological bar history.

use super::bar::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the series ordering contract.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("bar for {symbol} on {date} is not after the previous bar ({prev})")]
    OutOfOrder {
        symbol: String,
        date: NaiveDate,
        prev: NaiveDate,
    },

    #[error("bar symbol {bar_symbol} does not match series symbol {series_symbol}")]
    SymbolMismatch {
        series_symbol: String,
        bar_symbol: String,
    },
}

/// Ordered-by-date bar sequence for one symbol.
///
/// Invariant: strictly increasing dates, no duplicates — enforced at `push`,
/// so downstream code can index the tail without re-checking. Data providers
/// signal a missing session by omission, never by a zero-filled bar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
        }
    }

    /// Build a series from bars that are already in chronological order.
    pub fn from_bars(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let mut series = Self::new(symbol);
        for bar in bars {
            series.push(bar)?;
        }
        Ok(series)
    }

    pub fn push(&mut self, bar: Bar) -> Result<(), SeriesError> {
        if bar.symbol != self.symbol {
            return Err(SeriesError::SymbolMismatch {
                series_symbol: self.symbol.clone(),
                bar_symbol: bar.symbol,
            });
        }
        if let Some(last) = self.bars.last() {
            if bar.trade_date <= last.trade_date {
                return Err(SeriesError::OutOfOrder {
                    symbol: self.symbol.clone(),
                    date: bar.trade_date,
                    prev: last.trade_date,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Series restricted to bars on or before `as_of` (cloned tail view).
    pub fn up_to(&self, as_of: NaiveDate) -> BarSeries {
        BarSeries {
            symbol: self.symbol.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.trade_date <= as_of)
                .cloned()
                .collect(),
        }
    }

    /// Series holding only the last `n` bars (cloned).
    pub fn tail(&self, n: usize) -> BarSeries {
        let start = self.bars.len().saturating_sub(n);
        BarSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[start..].to_vec(),
        }
    }

    // f64 column extraction for indicator math. Signal thresholds tolerate
    // binary floats; account balances do not, so conversion happens here and
    // never inside the engine's accounting path.

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.trade_date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::open_f64).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::high_f64).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::low_f64).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::close_f64).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::volume_f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(date: (i32, u32, u32), close: rust_decimal::Decimal) -> Bar {
        Bar::from_ohlcv(
            "000001",
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            close,
            close,
            close,
            close,
            dec!(1000),
            dec!(10000),
        )
    }

    #[test]
    fn push_accepts_increasing_dates() {
        let mut s = BarSeries::new("000001");
        s.push(bar((2024, 1, 2), dec!(10))).unwrap();
        s.push(bar((2024, 1, 3), dec!(11))).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn push_rejects_duplicate_date() {
        let mut s = BarSeries::new("000001");
        s.push(bar((2024, 1, 2), dec!(10))).unwrap();
        let err = s.push(bar((2024, 1, 2), dec!(11)));
        assert!(matches!(err, Err(SeriesError::OutOfOrder { .. })));
    }

    #[test]
    fn push_rejects_backwards_date() {
        let mut s = BarSeries::new("000001");
        s.push(bar((2024, 1, 3), dec!(10))).unwrap();
        assert!(s.push(bar((2024, 1, 2), dec!(9))).is_err());
    }

    #[test]
    fn push_rejects_symbol_mismatch() {
        let mut s = BarSeries::new("600519");
        let err = s.push(bar((2024, 1, 2), dec!(10)));
        assert!(matches!(err, Err(SeriesError::SymbolMismatch { .. })));
    }

    #[test]
    fn up_to_cuts_the_tail() {
        let mut s = BarSeries::new("000001");
        s.push(bar((2024, 1, 2), dec!(10))).unwrap();
        s.push(bar((2024, 1, 3), dec!(11))).unwrap();
        s.push(bar((2024, 1, 4), dec!(12))).unwrap();
        let cut = s.up_to(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.closes(), vec![10.0, 11.0]);
    }

    #[test]
    fn tail_keeps_last_n() {
        let mut s = BarSeries::new("000001");
        for day in 2..=10 {
            s.push(bar((2024, 1, day), dec!(10))).unwrap();
        }
        assert_eq!(s.tail(3).len(), 3);
        assert_eq!(s.tail(100).len(), 9);
    }
}
