//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single symbol.
///
/// Prices, volume, and amount are decimal quantities — the accounting path
/// never touches binary floats. `avg_price` is the intraday reference price
/// the simulator fills at (OHLC/4 when the vendor does not supply VWAP).
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub avg_price: Decimal,
    pub volume: Decimal,
    pub amount: Decimal,
}

impl Bar {
    /// Build a bar from OHLCV columns, deriving `avg_price` as OHLC/4.
    #[allow(clippy::too_many_arguments)]
    pub fn from_ohlcv(
        symbol: impl Into<String>,
        trade_date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        amount: Decimal,
    ) -> Self {
        let avg_price = (open + high + low + close) / Decimal::from(4);
        Self {
            symbol: symbol.into(),
            trade_date,
            open,
            high,
            low,
            close,
            avg_price,
            volume,
            amount,
        }
    }

    /// Basic OHLC sanity check: high >= low, high bounds open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > Decimal::ZERO
            && self.close > Decimal::ZERO
    }

    pub fn open_f64(&self) -> f64 {
        self.open.to_f64().unwrap_or(f64::NAN)
    }

    pub fn high_f64(&self) -> f64 {
        self.high.to_f64().unwrap_or(f64::NAN)
    }

    pub fn low_f64(&self) -> f64 {
        self.low.to_f64().unwrap_or(f64::NAN)
    }

    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(f64::NAN)
    }

    pub fn volume_f64(&self) -> f64 {
        self.volume.to_f64().unwrap_or(f64::NAN)
    }

    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(f64::NAN)
    }
}
