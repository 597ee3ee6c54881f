//! Trend rule evaluator — scores one symbol's bar history against a
//! breakout/pullback pattern and reports a decision with auditable reasons.
//!
//! The evaluator is a report generator, not an order source: callers decide
//! whether to act. Every non-buy outcome carries a descriptive reason, and
//! missing history degrades to neutral output instead of an error.

use super::flow::IndustryFlowContext;
use crate::domain::regime::Regime;
use crate::domain::series::BarSeries;
use crate::domain::trend::{
    BuyAction, BuyAdvice, BuyMode, StopLossReport, TrendChecks, TrendReport,
};
use crate::indicators::{atr_last, ema, macd, rsi};

// Composite score weights. Breakout/new-high is the primary right-side signal.
const W_EMA: f64 = 0.25;
const W_MACD: f64 = 0.15;
const W_BREAK: f64 = 0.25;
const W_RSI: f64 = 0.15;
const W_VOL: f64 = 0.20;
const NEW_HIGH_BONUS: f64 = 3.0;

/// Evaluator thresholds. Policy knobs with the production defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    /// Bars needed for the full check set; fewer marks the report as thin.
    pub min_bars_full: usize,
    /// Bars needed before the buy decision is attempted at all.
    pub min_bars_buy: usize,
    /// Sessions scanned (excluding today) for a qualifying breakout day.
    pub breakout_lookback: usize,
    /// Volume multiple over the 20-day mean that confirms a breakout.
    pub breakout_vol_ratio: f64,
    /// Close within this fraction of the 20-day high counts as "near".
    pub near_high_pct: f64,
    /// Accepted RSI band for the trend check.
    pub rsi_range: (f64, f64),
    /// 5-day volume must hold this fraction of the 30-day mean.
    pub volume_floor_ratio: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_bars_full: 60,
            min_bars_buy: 26,
            breakout_lookback: 5,
            breakout_vol_ratio: 1.2,
            near_high_pct: 0.95,
            rsi_range: (50.0, 82.0),
            volume_floor_ratio: 0.9,
        }
    }
}

/// Everything the evaluator consumes for one symbol.
pub struct TrendInput<'a> {
    pub series: &'a BarSeries,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub flow: Option<&'a IndustryFlowContext>,
    pub regime: Regime,
}

fn clip01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().fold(f64::MIN, |a, &b| a.max(b))
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().fold(f64::MAX, |a, &b| a.min(b))
}

/// Evaluate one symbol's history. Never panics; thin history yields a
/// neutral report with `missing_data` markers.
pub fn evaluate_trend(input: &TrendInput<'_>, config: &TrendConfig) -> TrendReport {
    let mut report = TrendReport {
        symbol: input.series.symbol().to_string(),
        name: input.name.clone(),
        industry: input.industry.clone(),
        as_of: None,
        market_regime: input.regime,
        trend_ok: None,
        checks: TrendChecks::default(),
        score: None,
        score_parts: Default::default(),
        flow_reasons: Vec::new(),
        stop_loss: StopLossReport::default(),
        buy: BuyAdvice::default(),
        missing_data: Vec::new(),
    };

    let closes = input.series.closes();
    if closes.is_empty() {
        report.missing_data.push("no_bars".to_string());
        report.buy.why = "no bar history available".to_string();
        return report;
    }
    let opens = input.series.opens();
    let highs = input.series.highs();
    let lows = input.series.lows();
    let vols = input.series.volumes();
    let n = closes.len();
    let close = closes[n - 1];
    report.as_of = input.series.last().map(|b| b.trade_date);

    if n < config.min_bars_full {
        report
            .missing_data
            .push(format!("bars_lt_{}", config.min_bars_full));
    }

    // ── Trend checks ─────────────────────────────────────────────────────
    let ema5 = ema(&closes, 5);
    let ema20 = ema(&closes, 20);
    let ema60 = ema(&closes, 60);
    let ema5_last = *ema5.last().unwrap();
    let ema20_last = *ema20.last().unwrap();
    let ema60_last = *ema60.last().unwrap();
    // Short-term EMA noise is allowed; the trend gate is close over EMA20
    // over EMA60.
    report.checks.ema_order = Some(close > ema20_last && ema20_last > ema60_last);

    let (macd_line, _signal_line, hist) = macd(&closes, 12, 26, 9);
    let macd_last = *macd_line.last().unwrap();
    let hist_last = *hist.last().unwrap();
    report.checks.macd_positive = Some(macd_last > 0.0);
    // Only the zero axis is required here; histogram expansion is a soft
    // signal handled by the score.
    report.checks.macd_hist_expanding = Some(hist_last > 0.0);
    let hist4: Option<[f64; 4]> = (hist.len() >= 4).then(|| {
        let tail = &hist[hist.len() - 4..];
        [tail[0], tail[1], tail[2], tail[3]]
    });

    let rsi14_series = rsi(&closes, 14);
    let rsi14 = rsi14_series.last().copied();
    if let Some(r) = rsi14 {
        report.checks.rsi_in_range = Some(config.rsi_range.0 <= r && r <= config.rsi_range.1);
    }

    let high20_close = (n >= 20).then(|| max_of(&closes[n - 20..]));
    if let Some(h) = high20_close {
        report.checks.close_near_20d_high = Some(close >= config.near_high_pct * h);
    }

    let (avg_vol5, avg_vol30) = if vols.len() >= 30 {
        (Some(mean(&vols[n - 5..])), Some(mean(&vols[n - 30..])))
    } else {
        (None, None)
    };
    if let (Some(a5), Some(a30)) = (avg_vol5, avg_vol30) {
        // Volume surges are rewarded by the score; the check only blocks
        // outright volume cliffs.
        report.checks.volume_ok = Some(if a30 > 0.0 {
            a5 > config.volume_floor_ratio * a30
        } else {
            a5 > 0.0
        });
    }

    // ── Composite score ──────────────────────────────────────────────────
    if let (Some(high20), Some(rsi_val), Some(a5), Some(a30), Some(h4)) =
        (high20_close, rsi14, avg_vol5, avg_vol30, hist4)
    {
        let mut ema_pairs = 0;
        if ema5_last > ema20_last {
            ema_pairs += 1;
        }
        if ema20_last > ema60_last {
            ema_pairs += 1;
        }
        let s_ema = f64::from(ema_pairs) / 2.0;

        let hpos = [
            h4[0].max(0.0),
            h4[1].max(0.0),
            h4[2].max(0.0),
            h4[3].max(0.0),
        ];
        let mut inc = 0;
        if hpos[1] > hpos[0] {
            inc += 1;
        }
        if hpos[2] > hpos[1] {
            inc += 1;
        }
        if hpos[3] > hpos[2] {
            inc += 1;
        }
        let hist_min = if close > 0.0 { 0.0005 * close } else { 0.0 };
        let has_hist_strength = hpos[3] >= hist_min && hpos[3] > 0.0;
        let s_hist = if has_hist_strength {
            f64::from(inc) / 3.0
        } else {
            0.0
        };
        let s_macd = if macd_last <= 0.0 {
            0.0
        } else {
            clip01(0.5 + 0.5 * s_hist)
        };

        let high20_high = if n >= 20 { max_of(&highs[n - 20..]) } else { high20 };
        let ratio_hi = if high20_high > 0.0 { close / high20_high } else { 0.0 };
        let s_break = clip01((ratio_hi - 0.85) / 0.10);
        let bonus_new_high = if high20_high > 0.0 && close >= high20_high {
            NEW_HIGH_BONUS
        } else {
            0.0
        };

        // Momentum-friendly RSI subscore: centered at 70, decaying to 0 at
        // 55/85 — strong uptrends are not penalized.
        let s_rsi = clip01(1.0 - ((rsi_val - 70.0).abs() / 15.0));

        let ratio_vol = if a30 > 0.0 {
            a5 / a30
        } else if a5 > 0.0 {
            1.0
        } else {
            0.0
        };
        let s_vol = clip01((ratio_vol - 1.0) / 0.30);

        let pts_ema = 100.0 * W_EMA * s_ema;
        let pts_macd = 100.0 * W_MACD * s_macd;
        let pts_break = 100.0 * W_BREAK * s_break;
        let pts_rsi = 100.0 * W_RSI * s_rsi;
        let pts_vol = 100.0 * W_VOL * s_vol;

        report.score_parts.insert("ema".into(), round3(pts_ema));
        report.score_parts.insert("macd".into(), round3(pts_macd));
        report
            .score_parts
            .insert("breakout".into(), round3(pts_break));
        report.score_parts.insert("rsi".into(), round3(pts_rsi));
        report.score_parts.insert("volume".into(), round3(pts_vol));
        if bonus_new_high > 0.0 {
            report
                .score_parts
                .insert("bonus_new_high20".into(), round3(bonus_new_high));
        }

        let mut penalty = 0.0;
        if let Some(atr14) = atr_last(&highs, &lows, &closes, 14) {
            if close > 0.0 {
                let atr_ratio = atr14 / close;
                // Tolerate elevated ATR in strong themes: penalize only above
                // 3% ATR/close, on a soft slope.
                let p_vol = clip01((atr_ratio - 0.03) / 0.05) * 5.0;
                penalty += p_vol;
                report
                    .score_parts
                    .insert("penalty_volatility_atr".into(), -round3(p_vol));
            }
        }
        if ema20_last > 0.0 && close < ema20_last {
            let dd = (ema20_last - close) / ema20_last;
            let p_below = clip01(dd / 0.05) * 10.0;
            penalty += p_below;
            report
                .score_parts
                .insert("penalty_below_ema20".into(), -round3(p_below));
        }

        let total =
            pts_ema + pts_macd + pts_break + pts_rsi + pts_vol + bonus_new_high - penalty;
        let mut score = round3(total.clamp(0.0, 100.0));

        if let (Some(industry), Some(flow)) = (input.industry.as_deref(), input.flow) {
            let adj = flow.score_adjustment(industry);
            if !adj.parts.is_empty() {
                report.score_parts.extend(adj.parts.clone());
                report.flow_reasons = adj.reasons.clone();
            }
            if adj.delta != 0.0 {
                score = round3((score + adj.delta).clamp(0.0, 100.0));
            }
        }
        report.score = Some(score);
    }

    // ── Stop loss ────────────────────────────────────────────────────────
    // stop = max(structural support - atr_k * ATR14, current * (1 - max_loss)),
    // never above the current price; structure breaks override to exit-now.
    {
        let stop = &mut report.stop_loss;
        stop.parts.insert("current_price".into(), round6(close));

        let swing_low = if n >= 10 { min_of(&lows[n - 10..]) } else { min_of(&lows) };
        let platform_low = if n >= 20 {
            let slice = if n >= 25 { &lows[n - 20..n - 5] } else { &lows[..n - 5] };
            if slice.is_empty() { swing_low } else { min_of(slice) }
        } else if n > 5 {
            min_of(&lows[..n - 5])
        } else {
            swing_low
        };
        let structural_support = swing_low.max(platform_low).max(ema20_last);
        stop.parts.insert("swing_low_10d".into(), round6(swing_low));
        stop.parts
            .insert("platform_low_20d_excl_5d".into(), round6(platform_low));
        stop.parts.insert("ema20".into(), round6(ema20_last));
        stop.parts
            .insert("structural_support".into(), round6(structural_support));

        // Exit-now overrides: trend structure break and momentum exhaustion.
        if ema5_last < ema20_last {
            stop.exit_now = true;
            stop.exit_reasons
                .push("trend_structure_break:ema5_below_ema20".to_string());
        }
        if close < ema20_last {
            stop.exit_now = true;
            stop.exit_reasons
                .push("trend_structure_break:close_below_ema20".to_string());
        }

        if let Some(h4) = hist4 {
            let shrink_then_flip = h4[0] > h4[1] && h4[1] > h4[2] && h4[2] > 0.0 && h4[3] < 0.0;
            let mut shrink_cnt = 0;
            if h4[1] < h4[0] {
                shrink_cnt += 1;
            }
            if h4[2] < h4[1] {
                shrink_cnt += 1;
            }
            if h4[3] < h4[2] {
                shrink_cnt += 1;
            }
            match (avg_vol5, avg_vol30) {
                (Some(a5), Some(a30)) => {
                    let vol_dry = a30 > 0.0 && a5 < a30;
                    if shrink_then_flip && vol_dry {
                        stop.exit_now = true;
                        stop.exit_reasons.push(
                            "momentum_exhaustion:hist_shrink3_flip_negative_and_volume_dry"
                                .to_string(),
                        );
                    }
                    if !shrink_then_flip {
                        stop.parts
                            .insert("warn_hist_shrink_cnt_3".into(), f64::from(shrink_cnt));
                        if a30 > 0.0 {
                            stop.parts
                                .insert("warn_vol_ratio_5_30".into(), round6(a5 / a30));
                        }
                        if h4[3] > 0.0 && shrink_cnt >= 2 {
                            stop.warn_reduce_half = true;
                            stop.warn_reasons.push(
                                if vol_dry {
                                    "momentum_warning:hist_shrinking_and_volume_dry"
                                } else {
                                    "momentum_warning:hist_shrinking"
                                }
                                .to_string(),
                            );
                        }
                    }
                }
                _ => {
                    // Volume averages unavailable: warn on the histogram alone.
                    stop.parts
                        .insert("warn_hist_shrink_cnt_3".into(), f64::from(shrink_cnt));
                    if h4[3] > 0.0 && shrink_cnt >= 2 {
                        stop.warn_reduce_half = true;
                        stop.warn_reasons
                            .push("momentum_warning:hist_shrinking_volume_unknown".to_string());
                    }
                }
            }
        }

        if stop.exit_now {
            stop.price = Some(round6(close));
            stop.parts.insert("final_stop_loss".into(), round6(close));
        } else {
            // Volatility bin from the std-dev of the last 20 returns.
            let vol_std20 = (n >= 21)
                .then(|| {
                    let mut rets = Vec::with_capacity(20);
                    for i in n - 20..n {
                        let c0 = closes[i - 1];
                        if c0 > 0.0 {
                            rets.push(closes[i] / c0 - 1.0);
                        }
                    }
                    (rets.len() >= 10).then(|| {
                        let mu = mean(&rets);
                        let var = rets.iter().map(|r| (r - mu).powi(2)).sum::<f64>()
                            / rets.len() as f64;
                        var.max(0.0).sqrt()
                    })
                })
                .flatten();
            if let Some(v) = vol_std20 {
                stop.parts.insert("vol_std20".into(), round6(v));
            }

            let (atr_k, max_loss_pct) = match vol_std20 {
                None => (1.2, 0.08),
                Some(v) if v <= 0.02 => (1.1, 0.06),
                Some(v) if v <= 0.04 => (1.2, 0.08),
                Some(_) => (1.4, 0.10),
            };
            stop.parts.insert("atr_k".into(), atr_k);
            stop.parts.insert("max_loss_pct".into(), max_loss_pct);

            match atr_last(&highs, &lows, &closes, 14) {
                None => {
                    stop.price = None;
                    report.missing_data.push("atr14_unavailable".to_string());
                }
                Some(atr14) => {
                    let buffer = atr_k * atr14;
                    let hard_stop = close * (1.0 - max_loss_pct);
                    let support_stop = structural_support - buffer;
                    let final_stop = support_stop.max(hard_stop).min(close);
                    stop.parts.insert("atr14".into(), round6(atr14));
                    stop.parts.insert("buffer".into(), round6(buffer));
                    stop.parts.insert("hard_stop".into(), round6(hard_stop));
                    stop.parts
                        .insert("stop_loss_support_minus_buffer".into(), round6(support_stop));
                    stop.parts
                        .insert("final_stop_loss".into(), round6(final_stop));
                    stop.price = Some(round6(final_stop));
                }
            }
        }
    }

    // ── Buy decision: unified two-mode right-side system ─────────────────
    // Mode A: breakout + pullback. Mode B: momentum new-high, strong regime only.
    {
        let buy = &mut report.buy;
        buy.ref_price = Some(round6(close));

        if report.stop_loss.exit_now {
            buy.mode = BuyMode::None;
            buy.action = BuyAction::Avoid;
            buy.why = "exit signal active, entries blocked".to_string();
        } else if n >= config.min_bars_buy {
            let vol = vols[n - 1];
            let vol_prev = if n >= 2 { vols[n - 2] } else { vol };
            let vol_sma20 = (n >= 21).then(|| mean(&vols[n - 21..n - 1]));

            let ema20_rising = ema20.len() >= 2 && ema20[ema20.len() - 1] > ema20[ema20.len() - 2];
            let macd_hist_now = hist_last;
            let mut in_trend = close > ema20_last && ema20_rising && macd_hist_now > 0.0;
            let allow_mode_b = input.regime == Regime::Strong;
            buy.mode_b_allowed = allow_mode_b;
            if in_trend && !allow_mode_b {
                in_trend = false;
            }
            buy.in_trend = in_trend;

            if in_trend {
                buy.mode = BuyMode::BMomentum;
                let prev10_high = if n >= 11 {
                    max_of(&highs[n - 11..n - 1])
                } else {
                    max_of(&highs[..n - 1])
                };
                let new_high = close > prev10_high;
                let vol_ok = vol_sma20.is_some_and(|v| vol > v * config.breakout_vol_ratio);
                let macd_inc = hist.len() >= 2 && hist[hist.len() - 1] > hist[hist.len() - 2];
                let rsi_ok = rsi14.is_some_and(|r| r < 80.0);

                buy.zone_low = Some(round6(prev10_high));
                buy.zone_high = Some(round6(prev10_high * 1.02));
                if new_high && vol_ok && macd_inc && rsi_ok {
                    buy.action = BuyAction::Buy;
                    buy.why =
                        "mode B: new 10-day high in trend with volume and momentum confirmation"
                            .to_string();
                } else {
                    buy.action = BuyAction::Wait;
                    buy.why =
                        "mode B: in trend, waiting for a volume-confirmed new high".to_string();
                }
            } else {
                buy.mode = BuyMode::APullback;
                // Search the last N sessions (excluding today) for a breakout day.
                let mut breakout_level: Option<f64> = None;
                for k in 1..=config.breakout_lookback.min(n - 1) {
                    let di = n - 1 - k;
                    if di < 21 {
                        continue;
                    }
                    let level = max_of(&highs[di - 20..di]);
                    let vol_ma = mean(&vols[di - 20..di]);
                    if closes[di] > level && vols[di] > vol_ma * config.breakout_vol_ratio {
                        breakout_level = Some(level);
                        buy.breakout_offset = Some(k);
                        break;
                    }
                }
                buy.breakout_level = breakout_level.map(round6);

                let low10 = if n >= 10 { min_of(&lows[n - 10..]) } else { min_of(&lows) };
                let support = low10.max(ema20_last);
                buy.support = Some(round6(support));

                match breakout_level {
                    Some(level) => {
                        let pullback_signal = lows[n - 1] <= level * 1.01
                            && close >= support * 0.99
                            && vol < vol_prev
                            && close > opens[n - 1];
                        buy.pullback_signal = Some(pullback_signal);
                        buy.zone_low = Some(round6((support * 0.99).max(level * 0.99)));
                        buy.zone_high = Some(round6(level * 1.01));
                        if pullback_signal {
                            buy.action = BuyAction::Buy;
                            buy.why =
                                "mode A: pullback to support after breakout with drying volume"
                                    .to_string();
                        } else {
                            buy.action = BuyAction::Wait;
                            buy.why =
                                "mode A: inside the pullback window, waiting for volume to dry up"
                                    .to_string();
                        }
                    }
                    None => {
                        buy.action = BuyAction::Wait;
                        buy.why = format!(
                            "mode A: no breakout day found in the last {} sessions",
                            config.breakout_lookback
                        );
                    }
                }
            }
        } else {
            buy.mode = BuyMode::None;
            buy.action = BuyAction::Wait;
            buy.why = format!(
                "insufficient history (need at least {} daily bars)",
                config.min_bars_buy
            );
        }
    }

    // ── Final verdict ────────────────────────────────────────────────────
    report.trend_ok = report.checks.verdict();
    if report.trend_ok.is_none() {
        report
            .missing_data
            .push("insufficient_indicators".to_string());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use crate::domain::trend::TrendDecision;
    use chrono::{Duration, NaiveDate};
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;

    fn dec(x: f64) -> Decimal {
        Decimal::from_f64(x).unwrap()
    }

    fn series_from(symbol: &str, rows: &[(f64, f64, f64, f64, f64)]) -> BarSeries {
        // rows: (open, high, low, close, volume)
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = rows
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c, v))| {
                Bar::from_ohlcv(
                    symbol,
                    base + Duration::days(i as i64),
                    dec(o),
                    dec(h),
                    dec(l),
                    dec(c),
                    dec(v),
                    dec(v * c),
                )
            })
            .collect();
        BarSeries::from_bars(symbol, bars).unwrap()
    }

    fn flat_series(symbol: &str, days: usize, price: f64, volume: f64) -> BarSeries {
        let rows: Vec<_> = (0..days)
            .map(|_| (price, price, price, price, volume))
            .collect();
        series_from(symbol, &rows)
    }

    fn input<'a>(series: &'a BarSeries) -> TrendInput<'a> {
        TrendInput {
            series,
            name: None,
            industry: None,
            flow: None,
            regime: Regime::Weak,
        }
    }

    #[test]
    fn empty_history_is_neutral_with_reason() {
        let series = BarSeries::new("000001");
        let report = evaluate_trend(&input(&series), &TrendConfig::default());
        assert!(report.missing_data.contains(&"no_bars".to_string()));
        assert!(!report.buy.why.is_empty());
        assert_eq!(report.trend_ok, None);
    }

    #[test]
    fn flat_price_reports_pullback_mode_without_breakout() {
        let series = flat_series("000001", 40, 10.0, 1000.0);
        let report = evaluate_trend(&input(&series), &TrendConfig::default());
        assert_eq!(report.buy.mode, BuyMode::APullback);
        assert_eq!(report.buy.action, BuyAction::Wait);
        assert!(report.buy.why.contains("no breakout day"));
        assert!(report.buy.why.contains("5"));
        assert!(report.buy.breakout_level.is_none());
    }

    #[test]
    fn flat_price_decision_distills_the_report() {
        let series = flat_series("000001", 40, 10.0, 1000.0);
        let report = evaluate_trend(&input(&series), &TrendConfig::default());
        let decision = TrendDecision::from(&report);
        assert_eq!(decision.symbol, "000001");
        assert_eq!(decision.buy_mode, BuyMode::APullback);
        assert!(!decision.buy_reason.is_empty());
        assert!(!decision.sell_signal);
    }

    #[test]
    fn short_history_never_leaves_reason_empty() {
        for days in 1..30 {
            let series = flat_series("000001", days, 10.0, 1000.0);
            let report = evaluate_trend(&input(&series), &TrendConfig::default());
            if report.buy.action != BuyAction::Buy {
                assert!(
                    !report.buy.why.is_empty(),
                    "empty reason at {days} bars with action {:?}",
                    report.buy.action
                );
            }
        }
    }

    fn uptrend_series(symbol: &str, days: usize) -> BarSeries {
        // Steady gainer with a two-day ripple (+1.2% / -0.4%) so RSI stays
        // inside the trend band instead of saturating, and volume stepping up
        // over the last sessions. Ends on an up day when `days` is even.
        let mut c = 10.0;
        let rows: Vec<_> = (0..days)
            .map(|i| {
                if i > 0 {
                    c *= if i % 2 == 1 { 1.012 } else { 0.996 };
                }
                let vol = if i + 3 >= days { 3000.0 } else { 1000.0 };
                (c * 0.995, c * 1.012, c * 0.99, c, vol)
            })
            .collect();
        series_from(symbol, &rows)
    }

    #[test]
    fn steady_uptrend_passes_trend_checks() {
        let series = uptrend_series("600519", 80);
        let report = evaluate_trend(&input(&series), &TrendConfig::default());
        assert_eq!(report.checks.ema_order, Some(true));
        assert_eq!(report.checks.macd_positive, Some(true));
        assert_eq!(report.checks.close_near_20d_high, Some(true));
        assert_eq!(report.trend_ok, Some(true));
        let score = report.score.expect("score computed with full history");
        assert!(score > 50.0, "expected a strong score, got {score}");
    }

    #[test]
    fn downtrend_flags_exit_now() {
        let rows: Vec<_> = (0..80)
            .map(|i| {
                let c = 100.0 * 0.99f64.powi(i as i32);
                (c * 1.005, c * 1.01, c * 0.99, c, 1000.0)
            })
            .collect();
        let series = series_from("000002", &rows);
        let report = evaluate_trend(&input(&series), &TrendConfig::default());
        assert!(report.stop_loss.exit_now);
        assert!(!report.stop_loss.exit_reasons.is_empty());
        assert_eq!(report.buy.action, BuyAction::Avoid);
        assert_eq!(report.trend_ok, Some(false));
        // Exit-now stops at the current price.
        let last_close = series.closes()[79];
        assert_eq!(report.stop_loss.price, Some(round6(last_close)));
    }

    #[test]
    fn stop_loss_never_above_current_price() {
        let series = uptrend_series("600519", 80);
        let report = evaluate_trend(&input(&series), &TrendConfig::default());
        let close = series.closes()[79];
        let stop = report.stop_loss.price.expect("stop computed");
        assert!(stop <= close + 1e-9, "stop {stop} above close {close}");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let series = uptrend_series("600519", 80);
        let a = evaluate_trend(&input(&series), &TrendConfig::default());
        let b = evaluate_trend(&input(&series), &TrendConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn strong_regime_enables_mode_b() {
        let series = uptrend_series("600519", 80);
        let mut inp = input(&series);
        inp.regime = Regime::Strong;
        let report = evaluate_trend(&inp, &TrendConfig::default());
        assert!(report.buy.mode_b_allowed);
        if report.buy.in_trend {
            assert_eq!(report.buy.mode, BuyMode::BMomentum);
        }
        // Weak regime keeps the same symbol in mode A.
        let weak = evaluate_trend(&input(&series), &TrendConfig::default());
        assert!(!weak.buy.mode_b_allowed);
        assert_eq!(weak.buy.mode, BuyMode::APullback);
    }

    #[test]
    fn flow_context_adjusts_score() {
        use crate::trend::flow::{IndustryFlowContext, IndustryFlowRow};
        let series = uptrend_series("600519", 80);
        let base = evaluate_trend(&input(&series), &TrendConfig::default());
        let base_score = base.score.unwrap();

        let as_of = series.last().unwrap().trade_date;
        let rows: Vec<IndustryFlowRow> = (0..5)
            .flat_map(|d| {
                [
                    IndustryFlowRow {
                        date: as_of - Duration::days(d),
                        industry: "liquor".into(),
                        net_inflow: 5.0e8,
                    },
                    IndustryFlowRow {
                        date: as_of - Duration::days(d),
                        industry: "steel".into(),
                        net_inflow: -5.0e8,
                    },
                ]
            })
            .collect();
        let ctx = IndustryFlowContext::from_rows(&rows, as_of).unwrap();

        let mut inp = input(&series);
        inp.industry = Some("liquor".into());
        inp.flow = Some(&ctx);
        let boosted = evaluate_trend(&inp, &TrendConfig::default());
        assert!(boosted.score.unwrap() >= base_score);
        assert!(!boosted.flow_reasons.is_empty());
    }
}
