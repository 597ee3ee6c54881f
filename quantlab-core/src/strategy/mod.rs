//! Strategy contract and the explicit constructor registry.
//!
//! A strategy is a polymorphic decision unit: given a trade date, the day's
//! bars, and the current portfolio, it produces zero or more orders. It must
//! not mutate the portfolio (the signature hands it a shared reference) and
//! must be repeatable — the same date/bars/portfolio produce the same orders.
//!
//! Strategy selection is an explicit name→constructor map built once and
//! passed to the caller. No module-level mutable registry.

pub mod sample_momentum;
pub mod watchlist_trend;

pub use sample_momentum::SampleMomentumStrategy;
pub use watchlist_trend::{TrendThresholds, WatchlistTrendStrategy};

use crate::domain::bar::Bar;
use crate::domain::order::Order;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::regime::classifier::RegimeClassifier;
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// The strategy capability.
///
/// `on_bar` receives only bars that passed the universe and daily-rule
/// filters. Symbols with insufficient history are "not yet evaluable" — a
/// strategy emits no order for them, neither buy nor sell.
pub trait Strategy: Send {
    /// Registry name (e.g. "watchlist_trend").
    fn name(&self) -> &str;

    fn on_start(&mut self, _start: NaiveDate, _end: NaiveDate) {}

    /// Produce orders for one trade date. Must be idempotent for identical
    /// inputs: feeding the same date twice may not change the result.
    fn on_bar(
        &mut self,
        trade_date: NaiveDate,
        bars: &BTreeMap<String, Bar>,
        portfolio: &PortfolioSnapshot,
    ) -> Vec<Order>;

    fn on_finish(&mut self, _portfolio: &PortfolioSnapshot) {}
}

/// Named strategy selection with free-form numeric parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// Collaborators a strategy may hold, fixed at construction.
#[derive(Clone)]
pub struct StrategyContext {
    pub regime: Arc<RegimeClassifier>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

type StrategyCtor = Box<dyn Fn(&StrategyConfig, &StrategyContext) -> Box<dyn Strategy> + Send + Sync>;

/// Explicit mapping from strategy name to constructor.
#[derive(Default)]
pub struct StrategyRegistry {
    ctors: BTreeMap<String, StrategyCtor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in strategy set.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("watchlist_trend", |config, ctx| {
            Box::new(WatchlistTrendStrategy::new(
                param_usize(config, "fast_window", 5),
                param_usize(config, "mid_window", 15),
                param_usize(config, "slow_window", 30),
                param_decimal(config, "position_pct", Decimal::new(2, 1)),
                TrendThresholds::default(),
                ctx.regime.clone(),
            ))
        });
        registry.register("sample_momentum", |config, _ctx| {
            Box::new(SampleMomentumStrategy::new(param_decimal(
                config,
                "position_pct",
                Decimal::ONE,
            )))
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&StrategyConfig, &StrategyContext) -> Box<dyn Strategy> + Send + Sync + 'static,
    {
        self.ctors.insert(name.into(), Box::new(ctor));
    }

    pub fn create(
        &self,
        config: &StrategyConfig,
        ctx: &StrategyContext,
    ) -> Result<Box<dyn Strategy>, RegistryError> {
        let ctor = self
            .ctors
            .get(&config.name)
            .ok_or_else(|| RegistryError::UnknownStrategy(config.name.clone()))?;
        Ok(ctor(config, ctx))
    }

    pub fn names(&self) -> Vec<&str> {
        self.ctors.keys().map(|s| s.as_str()).collect()
    }
}

/// Extract a named parameter, falling back to `default`.
fn param_usize(config: &StrategyConfig, name: &str, default: usize) -> usize {
    config
        .params
        .get(name)
        .copied()
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn param_decimal(config: &StrategyConfig, name: &str, default: Decimal) -> Decimal {
    config
        .params
        .get(name)
        .copied()
        .and_then(Decimal::from_f64)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::classifier::RegimeConfig;

    fn ctx() -> StrategyContext {
        StrategyContext {
            regime: Arc::new(RegimeClassifier::new(Vec::new(), RegimeConfig::default())),
        }
    }

    #[test]
    fn builtin_registry_lists_strategies() {
        let registry = StrategyRegistry::builtin();
        let names = registry.names();
        assert!(names.contains(&"watchlist_trend"));
        assert!(names.contains(&"sample_momentum"));
    }

    #[test]
    fn create_known_strategy() {
        let registry = StrategyRegistry::builtin();
        let config = StrategyConfig {
            name: "sample_momentum".into(),
            params: BTreeMap::new(),
        };
        let strategy = registry.create(&config, &ctx()).unwrap();
        assert_eq!(strategy.name(), "sample_momentum");
    }

    #[test]
    fn create_unknown_strategy_errors() {
        let registry = StrategyRegistry::builtin();
        let config = StrategyConfig {
            name: "bogus".into(),
            params: BTreeMap::new(),
        };
        assert!(matches!(
            registry.create(&config, &ctx()),
            Err(RegistryError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn params_override_defaults() {
        let registry = StrategyRegistry::builtin();
        let mut params = BTreeMap::new();
        params.insert("fast_window".to_string(), 3.0);
        let config = StrategyConfig {
            name: "watchlist_trend".into(),
            params,
        };
        // Construction succeeds with overridden windows.
        assert!(registry.create(&config, &ctx()).is_ok());
    }

    #[test]
    fn param_helpers() {
        let mut params = BTreeMap::new();
        params.insert("x".to_string(), 42.0);
        let config = StrategyConfig {
            name: "any".into(),
            params,
        };
        assert_eq!(param_usize(&config, "x", 7), 42);
        assert_eq!(param_usize(&config, "missing", 7), 7);
        assert_eq!(
            param_decimal(&config, "x", Decimal::ONE),
            Decimal::from(42)
        );
    }
}
