//! Watchlist trend strategy — regime-gated breakout and pullback entries.

use super::Strategy;
use crate::domain::bar::Bar;
use crate::domain::order::Order;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::regime::Regime;
use crate::indicators::{ema, macd, rsi};
use crate::regime::classifier::RegimeClassifier;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Rolling bars kept per symbol; enough for the slow window plus slack.
const HISTORY_CAP: usize = 200;

/// Entry/exit sensitivity knobs. Policy, not structure.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendThresholds {
    /// Close must be within this fraction of the 20-day high to count as a breakout.
    pub breakout_high_pct: f64,
    /// RSI band accepted for breakout entries.
    pub breakout_rsi: (f64, f64),
    /// RSI band accepted for pullback entries.
    pub pullback_rsi: (f64, f64),
    /// Relative band around the mid EMA that counts as a pullback.
    pub pullback_band: f64,
    /// Relative drop below the mid EMA that triggers an exit.
    pub exit_band: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            breakout_high_pct: 0.95,
            breakout_rsi: (55.0, 82.0),
            pullback_rsi: (45.0, 75.0),
            pullback_band: 0.03,
            exit_band: 0.03,
        }
    }
}

/// Reference strategy: per-symbol rolling history, EMA stack, MACD, RSI, and
/// a 20-day-high breakout test, gated by the market regime.
///
/// Buys only when the regime is not unfavorable (`Strong` allows breakout and
/// pullback entries, `Diverging` only pullbacks, `Weak`/`Unknown` none) and
/// only for symbols not already held. Sells only symbols currently held whose
/// trend structure broke. Symbols with fewer bars than the slow window are
/// not yet evaluable and produce no order.
pub struct WatchlistTrendStrategy {
    fast_window: usize,
    mid_window: usize,
    slow_window: usize,
    position_pct: Decimal,
    thresholds: TrendThresholds,
    regime: Arc<RegimeClassifier>,
    history: BTreeMap<String, VecDeque<Bar>>,
    regime_cache: BTreeMap<NaiveDate, Regime>,
}

impl WatchlistTrendStrategy {
    pub fn new(
        fast_window: usize,
        mid_window: usize,
        slow_window: usize,
        position_pct: Decimal,
        thresholds: TrendThresholds,
        regime: Arc<RegimeClassifier>,
    ) -> Self {
        let fast_window = fast_window.max(2);
        let mid_window = mid_window.max(fast_window + 1);
        let slow_window = slow_window.max(mid_window + 1);
        Self {
            fast_window,
            mid_window,
            slow_window,
            position_pct,
            thresholds,
            regime,
            history: BTreeMap::new(),
            regime_cache: BTreeMap::new(),
        }
    }

    fn regime_for(&mut self, trade_date: NaiveDate) -> Regime {
        if let Some(&cached) = self.regime_cache.get(&trade_date) {
            return cached;
        }
        let regime = self.regime.classify(Some(trade_date)).regime;
        self.regime_cache.insert(trade_date, regime);
        regime
    }

    /// Append the bar to the symbol's rolling history. A bar for a date the
    /// history already ends on replaces it, so re-evaluating the same date
    /// is idempotent.
    fn absorb(history: &mut VecDeque<Bar>, bar: &Bar) {
        let same_date = history
            .back()
            .is_some_and(|last| last.trade_date == bar.trade_date);
        if same_date {
            if let Some(last) = history.back_mut() {
                *last = bar.clone();
            }
            return;
        }
        history.push_back(bar.clone());
        if history.len() > HISTORY_CAP {
            history.pop_front();
        }
    }
}

impl Strategy for WatchlistTrendStrategy {
    fn name(&self) -> &str {
        "watchlist_trend"
    }

    fn on_bar(
        &mut self,
        trade_date: NaiveDate,
        bars: &BTreeMap<String, Bar>,
        portfolio: &PortfolioSnapshot,
    ) -> Vec<Order> {
        if bars.is_empty() {
            return Vec::new();
        }
        let regime = self.regime_for(trade_date);
        let mut orders = Vec::new();

        for (code, bar) in bars {
            let history = self.history.entry(code.clone()).or_default();
            Self::absorb(history, bar);
            if history.len() < self.slow_window {
                continue; // not yet evaluable
            }

            let closes: Vec<f64> = history.iter().map(Bar::close_f64).collect();
            let highs: Vec<f64> = history.iter().map(Bar::high_f64).collect();

            let ema_fast = *ema(&closes, self.fast_window).last().unwrap_or(&f64::NAN);
            let ema_mid = *ema(&closes, self.mid_window).last().unwrap_or(&f64::NAN);
            let ema_slow = *ema(&closes, self.slow_window).last().unwrap_or(&f64::NAN);
            let (macd_line, _signal, hist) = macd(&closes, 12, 26, 9);
            let macd_last = macd_line.last().copied().unwrap_or(0.0);
            let hist_last = hist.last().copied().unwrap_or(0.0);
            let rsi14 = if closes.len() >= 14 {
                rsi(&closes, 14).last().copied().unwrap_or(50.0)
            } else {
                50.0
            };
            let high20 = highs[highs.len().saturating_sub(20)..]
                .iter()
                .fold(f64::MIN, |a, &b| a.max(b));
            let close = bar.close_f64();
            let t = &self.thresholds;

            let breakout_ok = close >= t.breakout_high_pct * high20
                && ema_mid > ema_slow
                && macd_last > 0.0
                && hist_last > 0.0
                && (t.breakout_rsi.0..=t.breakout_rsi.1).contains(&rsi14);
            let pullback_ok = ema_mid > ema_slow
                && macd_last > 0.0
                && (t.pullback_rsi.0..=t.pullback_rsi.1).contains(&rsi14)
                && close >= ema_mid * (1.0 - t.pullback_band)
                && close <= ema_mid * (1.0 + t.pullback_band);
            // Structure break: price under the mid average, averages inverted,
            // fast average crossing under, or momentum flipped negative.
            let sell_ok = close < ema_mid * (1.0 - t.exit_band)
                || ema_fast < ema_mid
                || ema_mid < ema_slow
                || macd_last < 0.0;

            if sell_ok {
                if portfolio.has_position(code) {
                    orders.push(Order::exit(code.clone(), "trend structure weak"));
                }
                continue;
            }

            if portfolio.has_position(code) {
                continue;
            }
            match regime {
                Regime::Strong if breakout_ok => {
                    orders.push(Order::buy_target(
                        code.clone(),
                        self.position_pct,
                        "breakout near 20-day high in strong market",
                    ));
                }
                Regime::Strong if pullback_ok => {
                    orders.push(Order::buy_target(
                        code.clone(),
                        self.position_pct,
                        "pullback to rising mid-term average in strong market",
                    ));
                }
                Regime::Diverging if pullback_ok => {
                    orders.push(Order::buy_target(
                        code.clone(),
                        self.position_pct,
                        "pullback entry in diverging market",
                    ));
                }
                _ => {} // Weak/Unknown: no new entries.
            }
        }
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::BarSeries;
    use crate::regime::classifier::RegimeConfig;
    use chrono::Duration;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal_macros::dec;

    fn bar(symbol: &str, day: i64, close: f64) -> Bar {
        let px = Decimal::from_f64(close).unwrap();
        Bar::from_ohlcv(
            symbol,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day),
            px,
            px * dec!(1.01),
            px * dec!(0.99),
            px,
            dec!(10000),
            px * dec!(10000),
        )
    }

    fn strong_classifier() -> Arc<RegimeClassifier> {
        let mk = |symbol: &str| {
            let bars = (0..60).map(|i| bar(symbol, i, 100.0 + i as f64)).collect();
            BarSeries::from_bars(symbol, bars).unwrap()
        };
        Arc::new(RegimeClassifier::new(
            vec![
                ("SSE".into(), mk("000001.SH")),
                ("ChiNext".into(), mk("399006.SZ")),
            ],
            RegimeConfig::default(),
        ))
    }

    fn strategy() -> WatchlistTrendStrategy {
        WatchlistTrendStrategy::new(
            5,
            15,
            30,
            dec!(0.2),
            TrendThresholds::default(),
            strong_classifier(),
        )
    }

    /// Uptrend with a two-day ripple (+1.2% / -0.4%) so RSI stays inside the
    /// entry bands instead of saturating.
    fn ripple_close(day: i64) -> f64 {
        let pair = (1.012f64 * 0.996).powi((day / 2) as i32);
        let extra = if day % 2 == 1 { 1.012 } else { 1.0 };
        100.0 * pair * extra
    }

    fn feed_history(s: &mut WatchlistTrendStrategy, symbol: &str, days: i64) -> NaiveDate {
        let portfolio = PortfolioSnapshot::new(dec!(1000000));
        let mut last = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for day in 0..days {
            let b = bar(symbol, day, ripple_close(day));
            last = b.trade_date;
            let mut bars = BTreeMap::new();
            bars.insert(symbol.to_string(), b);
            s.on_bar(last, &bars, &portfolio);
        }
        last
    }

    #[test]
    fn short_history_emits_nothing() {
        let mut s = strategy();
        let portfolio = PortfolioSnapshot::new(dec!(1000000));
        let mut bars = BTreeMap::new();
        bars.insert("600519".to_string(), bar("600519", 0, 100.0));
        let orders = s.on_bar(bars["600519"].trade_date, &bars, &portfolio);
        assert!(orders.is_empty());
    }

    #[test]
    fn steady_uptrend_buys_in_strong_market() {
        let mut s = strategy();
        feed_history(&mut s, "600519", 59);
        let portfolio = PortfolioSnapshot::new(dec!(1000000));
        let b = bar("600519", 59, ripple_close(59));
        let date = b.trade_date;
        let mut bars = BTreeMap::new();
        bars.insert("600519".to_string(), b);
        let orders = s.on_bar(date, &bars, &portfolio);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].action, crate::domain::order::OrderAction::Buy);
        assert!(!orders[0].reason.is_empty());
    }

    #[test]
    fn on_bar_is_idempotent_for_same_date() {
        let mut s = strategy();
        feed_history(&mut s, "600519", 59);
        let portfolio = PortfolioSnapshot::new(dec!(1000000));
        let b = bar("600519", 59, ripple_close(59));
        let date = b.trade_date;
        let mut bars = BTreeMap::new();
        bars.insert("600519".to_string(), b);
        let first = s.on_bar(date, &bars, &portfolio);
        let second = s.on_bar(date, &bars, &portfolio);
        assert_eq!(first, second);
    }

    #[test]
    fn no_sell_for_unheld_symbol() {
        let mut s = strategy();
        // Downtrend: sell condition fires, but nothing is held.
        let portfolio = PortfolioSnapshot::new(dec!(1000000));
        let mut orders = Vec::new();
        for day in 0..60 {
            let b = bar("600519", day, 200.0 - day as f64);
            let date = b.trade_date;
            let mut bars = BTreeMap::new();
            bars.insert("600519".to_string(), b);
            orders = s.on_bar(date, &bars, &portfolio);
        }
        assert!(orders.is_empty());
    }
}
