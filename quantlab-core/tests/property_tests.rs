//! Property tests for engine and indicator invariants.
//!
//! 1. Cash never goes negative and the equity identity holds under random
//!    order streams.
//! 2. RSI stays inside [0, 100] for arbitrary price walks.
//! 3. Indicator outputs stay aligned to their inputs.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use quantlab_core::data::MarketData;
use quantlab_core::domain::{Bar, BarSeries, Order, PortfolioSnapshot, ScoreConfig};
use quantlab_core::engine::run_backtest;
use quantlab_core::engine::BacktestParams;
use quantlab_core::filters::{DailyRuleFilter, UniverseFilter};
use quantlab_core::indicators::{ema, macd, rsi};
// Aliased: proptest's prelude also exports a `Strategy` trait.
use quantlab_core::strategy::Strategy as TradingStrategy;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn series_with_closes(symbol: &str, closes: &[f64]) -> BarSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let px = Decimal::from_f64(c).unwrap();
            Bar::from_ohlcv(
                symbol,
                base_date() + Duration::days(i as i64),
                px,
                px + dec!(0.5),
                (px - dec!(0.5)).max(dec!(0.01)),
                px,
                dec!(1000),
                px * dec!(1000),
            )
        })
        .collect();
    BarSeries::from_bars(symbol, bars).unwrap()
}

struct InstructionStrategy {
    orders_by_date: BTreeMap<NaiveDate, Vec<Order>>,
}

impl TradingStrategy for InstructionStrategy {
    fn name(&self) -> &str {
        "instructions"
    }

    fn on_bar(
        &mut self,
        trade_date: NaiveDate,
        _bars: &BTreeMap<String, Bar>,
        _portfolio: &PortfolioSnapshot,
    ) -> Vec<Order> {
        self.orders_by_date
            .get(&trade_date)
            .cloned()
            .unwrap_or_default()
    }
}

fn arb_close() -> impl Strategy<Value = f64> {
    (5.0..50.0f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

proptest! {
    /// Random order streams can be rejected but never corrupt the books:
    /// cash stays non-negative and equity always equals cash plus the
    /// mark-to-market of open positions.
    #[test]
    fn accounting_survives_random_order_streams(
        closes in proptest::collection::vec(arb_close(), 10..25),
        instructions in proptest::collection::vec(
            (0usize..25, any::<bool>(), 1u32..5000),
            0..20,
        ),
    ) {
        let days = closes.len();
        let data = MarketData::from_series([series_with_closes("000001", &closes)]);

        let mut orders_by_date: BTreeMap<NaiveDate, Vec<Order>> = BTreeMap::new();
        for &(day, is_buy, qty) in &instructions {
            let date = base_date() + Duration::days((day % days) as i64);
            let qty = Decimal::from(qty);
            let order = if is_buy {
                Order::buy_qty("000001", qty, "random buy")
            } else {
                Order::sell_qty("000001", qty, "random sell")
            };
            orders_by_date.entry(date).or_default().push(order);
        }

        let params = BacktestParams::new(
            base_date(),
            base_date() + Duration::days(days as i64),
            dec!(100000),
        )
        .unwrap()
        .with_warmup(0);
        let mut strategy = InstructionStrategy { orders_by_date };
        let result = run_backtest(
            &data,
            &params,
            &mut strategy,
            &UniverseFilter::from_symbols(["000001"]),
            &DailyRuleFilter::default(),
            &ScoreConfig::default(),
        )
        .unwrap();

        for (point, day) in result.equity_curve.iter().zip(result.daily_log.iter()) {
            prop_assert!(point.cash >= Decimal::ZERO, "cash went negative on {}", point.date);
            let close = data
                .bars_on(point.date)
                .and_then(|bars| bars.get("000001"))
                .map(|bar| bar.close)
                .unwrap();
            let position_value: Decimal = day.positions.values().map(|qty| *qty * close).sum();
            prop_assert_eq!(point.equity, point.cash + position_value);
        }
    }

    /// RSI output is bounded for arbitrary walks.
    #[test]
    fn rsi_bounded_on_random_walks(
        closes in proptest::collection::vec(arb_close(), 2..200),
    ) {
        let out = rsi(&closes, 14);
        prop_assert_eq!(out.len(), closes.len());
        for v in out {
            prop_assert!((0.0..=100.0).contains(&v));
        }
    }

    /// EMA and MACD outputs stay aligned to their input.
    #[test]
    fn indicator_outputs_aligned(
        closes in proptest::collection::vec(arb_close(), 1..100),
        period in 1usize..30,
    ) {
        prop_assert_eq!(ema(&closes, period).len(), closes.len());
        let (m, s, h) = macd(&closes, 12, 26, 9);
        prop_assert_eq!(m.len(), closes.len());
        prop_assert_eq!(s.len(), closes.len());
        prop_assert_eq!(h.len(), closes.len());
    }

    /// The same random run twice is bit-identical (determinism).
    #[test]
    fn random_runs_are_reproducible(
        closes in proptest::collection::vec(arb_close(), 10..20),
    ) {
        let data = MarketData::from_series([series_with_closes("000001", &closes)]);
        let params = BacktestParams::new(
            base_date(),
            base_date() + Duration::days(closes.len() as i64),
            dec!(50000),
        )
        .unwrap()
        .with_warmup(0);
        let run = || {
            let mut strategy = InstructionStrategy { orders_by_date: BTreeMap::new() };
            run_backtest(
                &data,
                &params,
                &mut strategy,
                &UniverseFilter::from_symbols(["000001"]),
                &DailyRuleFilter::default(),
                &ScoreConfig::default(),
            )
            .unwrap()
        };
        prop_assert_eq!(run(), run());
    }
}
