//! BacktestParams — validated once, immutable for the run's lifetime.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("start_date {start} must be before end_date {end}")]
    DateOrder { start: NaiveDate, end: NaiveDate },

    #[error("initial_cash must be positive (got {0})")]
    NonPositiveCash(Decimal),

    #[error("fee_rate and slippage_rate must be non-negative")]
    NegativeRate,
}

/// Parameters for one backtest run.
///
/// Validated at construction; an invalid combination never starts a run.
/// `warmup_days` extends the data window backwards (calendar-approximated)
/// so strategies see warm indicator history on `start_date` without trading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: Decimal,
    #[serde(default)]
    pub fee_rate: Decimal,
    #[serde(default)]
    pub slippage_rate: Decimal,
    #[serde(default = "default_warmup_days")]
    pub warmup_days: u32,
}

fn default_warmup_days() -> u32 {
    20
}

impl BacktestParams {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        initial_cash: Decimal,
    ) -> Result<Self, ParamsError> {
        let params = Self {
            start_date,
            end_date,
            initial_cash,
            fee_rate: Decimal::ZERO,
            slippage_rate: Decimal::ZERO,
            warmup_days: default_warmup_days(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_costs(
        mut self,
        fee_rate: Decimal,
        slippage_rate: Decimal,
    ) -> Result<Self, ParamsError> {
        self.fee_rate = fee_rate;
        self.slippage_rate = slippage_rate;
        self.validate()?;
        Ok(self)
    }

    pub fn with_warmup(mut self, warmup_days: u32) -> Self {
        self.warmup_days = warmup_days;
        self
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.start_date >= self.end_date {
            return Err(ParamsError::DateOrder {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.initial_cash <= Decimal::ZERO {
            return Err(ParamsError::NonPositiveCash(self.initial_cash));
        }
        if self.fee_rate < Decimal::ZERO || self.slippage_rate < Decimal::ZERO {
            return Err(ParamsError::NegativeRate);
        }
        Ok(())
    }

    /// First date fed to the strategy, approximating `warmup_days` trading
    /// days with twice as many calendar days.
    pub fn warmup_start(&self) -> NaiveDate {
        self.start_date - Duration::days(i64::from(self.warmup_days) * 2)
    }
}
