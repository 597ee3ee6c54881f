//! Quantlab Core — backtesting and signal-evaluation engine.
//!
//! This crate contains the heart of the platform:
//! - Domain types (bars, series, portfolio, orders, regime, trend decisions)
//! - Pure indicator library (EMA, MACD, RSI, ATR)
//! - Market regime classifier and the exchange session calendar
//! - Universe and daily rule filters
//! - Strategy trait with an explicit constructor registry
//! - Trend rule evaluator with auditable reasons
//! - Deterministic date-loop backtest engine with reject-don't-clip orders
//! - Live watchlist momentum plans
//!
//! The core performs no I/O: data arrives through the `BarProvider` trait or
//! a materialized `MarketData`, and results leave as plain structs.

pub mod alerts;
pub mod data;
pub mod domain;
pub mod engine;
pub mod filters;
pub mod fingerprint;
pub mod indicators;
pub mod regime;
pub mod strategy;
pub mod trend;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync, so independent
    /// backtest runs can be dispatched across threads without retrofits.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::PortfolioSnapshot>();
        require_sync::<domain::PortfolioSnapshot>();
        require_send::<domain::MarketRegime>();
        require_sync::<domain::MarketRegime>();
        require_send::<domain::TrendReport>();
        require_sync::<domain::TrendReport>();
        require_send::<domain::TrendDecision>();
        require_sync::<domain::TrendDecision>();

        // Filters and config
        require_send::<filters::UniverseFilter>();
        require_sync::<filters::UniverseFilter>();
        require_send::<filters::DailyRuleFilter>();
        require_sync::<filters::DailyRuleFilter>();
        require_send::<domain::ScoreConfig>();
        require_sync::<domain::ScoreConfig>();

        // Engine types
        require_send::<engine::BacktestParams>();
        require_sync::<engine::BacktestParams>();
        require_send::<engine::BacktestResult>();
        require_sync::<engine::BacktestResult>();

        // Data types
        require_send::<data::MarketData>();
        require_sync::<data::MarketData>();

        // Classifier and evaluator inputs are shared across symbol workers.
        require_send::<regime::RegimeClassifier>();
        require_sync::<regime::RegimeClassifier>();
        require_send::<trend::IndustryFlowContext>();
        require_sync::<trend::IndustryFlowContext>();

        // Alerts
        require_send::<alerts::MomentumPlan>();
        require_sync::<alerts::MomentumPlan>();
    }

    /// Architecture contract: `Strategy::on_bar` takes the portfolio by
    /// shared reference. Strategies cannot mutate portfolio state — the
    /// type system enforces it; this test documents the contract.
    #[test]
    fn strategy_cannot_mutate_portfolio() {
        fn _check_signature(
            strategy: &mut dyn strategy::Strategy,
            date: chrono::NaiveDate,
            bars: &std::collections::BTreeMap<String, domain::Bar>,
            portfolio: &domain::PortfolioSnapshot,
        ) -> Vec<domain::Order> {
            strategy.on_bar(date, bars, portfolio)
        }
    }
}
