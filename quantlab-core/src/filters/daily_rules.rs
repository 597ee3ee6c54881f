//! Daily rule filter — per-bar eligibility before a strategy sees the bar.

use crate::domain::bar::Bar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rejects bars that are untradeable or outside configured bounds.
///
/// Rejection is silent at this layer: the symbol is simply excluded from
/// that day's candidate set, no reason attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRuleFilter {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_volume: Option<Decimal>,
    pub max_volume: Option<Decimal>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Reject zero-volume bars (suspended for the session).
    #[serde(default)]
    pub reject_suspended: bool,
    /// Reject one-price bars (limit-up/limit-down locked all day).
    #[serde(default)]
    pub reject_limit_locked: bool,
}

impl DailyRuleFilter {
    /// Common defaults: drop suspended and limit-locked bars.
    pub fn standard() -> Self {
        Self {
            reject_suspended: true,
            reject_limit_locked: true,
            ..Default::default()
        }
    }

    pub fn accepts(&self, bar: &Bar) -> bool {
        if self.reject_suspended && bar.volume <= Decimal::ZERO {
            return false;
        }
        if self.reject_limit_locked && bar.high == bar.low {
            return false;
        }
        if self.min_price.is_some_and(|min| bar.close < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| bar.close > max) {
            return false;
        }
        if self.min_volume.is_some_and(|min| bar.volume < min) {
            return false;
        }
        if self.max_volume.is_some_and(|max| bar.volume > max) {
            return false;
        }
        if self.min_amount.is_some_and(|min| bar.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| bar.amount > max) {
            return false;
        }
        true
    }
}
