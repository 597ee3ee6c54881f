//! Market regime classifier — index traffic lights combined into a regime.
//!
//! Each reference index gets a traffic-light signal from close vs the long
//! moving average and the long MA's slope. Two green indexes make a `Strong`
//! market, exactly one makes it `Diverging`, none makes it `Weak`; with no
//! usable reference data the classifier reports `Unknown` and callers must
//! stay conservative.

use crate::domain::regime::{IndexSignal, MarketRegime, Regime, RegimeBias, TrafficLight};
use crate::domain::series::BarSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Classification cutoffs. Policy, not structure — tune per market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Short MA window used for sideways diagnostics.
    pub ma_short: usize,
    /// Long MA window driving the traffic light.
    pub ma_long: usize,
    /// Relative distance to the long MA considered "near".
    pub near_ma_tolerance: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            ma_short: 5,
            ma_long: 20,
            near_ma_tolerance: 0.01,
        }
    }
}

struct IndexRef {
    name: String,
    series: BarSeries,
}

/// Classifier over a fixed set of reference index histories.
///
/// Pure: the same histories and `as_of` always produce the same regime.
/// Safe to share across threads and to consult per trade date inside a
/// backtest.
pub struct RegimeClassifier {
    indexes: Vec<IndexRef>,
    config: RegimeConfig,
}

impl RegimeClassifier {
    /// `indexes` pairs a display name with that index's bar history.
    pub fn new(indexes: Vec<(String, BarSeries)>, config: RegimeConfig) -> Self {
        Self {
            indexes: indexes
                .into_iter()
                .map(|(name, series)| IndexRef { name, series })
                .collect(),
            config,
        }
    }

    /// Classify the market as of the given date (or the latest data).
    pub fn classify(&self, as_of: Option<NaiveDate>) -> MarketRegime {
        let index_signals: Vec<IndexSignal> = self
            .indexes
            .iter()
            .map(|ix| self.index_signal(ix, as_of))
            .collect();
        let derived_as_of = index_signals.iter().filter_map(|s| s.as_of).max();

        if index_signals
            .iter()
            .all(|s| s.signal == TrafficLight::Unknown)
        {
            return MarketRegime {
                regime: Regime::Unknown,
                bias: None,
                as_of: derived_as_of,
                index_signals,
            };
        }

        let (regime, bias) = combine_signals(&index_signals);
        MarketRegime {
            regime,
            bias,
            as_of: derived_as_of,
            index_signals,
        }
    }

    fn index_signal(&self, index: &IndexRef, as_of: Option<NaiveDate>) -> IndexSignal {
        let series = match as_of {
            Some(date) => index.series.up_to(date),
            None => index.series.clone(),
        };
        let window = 10 + self.config.ma_long.max(self.config.ma_short);
        let series = series.tail(window);
        let closes = series.closes();
        let last_date = series.last().map(|b| b.trade_date);
        let long = self.config.ma_long;
        let short = self.config.ma_short;

        if closes.len() < long + 1 {
            return IndexSignal {
                symbol: series.symbol().to_string(),
                name: index.name.clone(),
                as_of: last_date,
                close: closes.last().copied(),
                ma_short: None,
                ma_long: None,
                ma_long_prev: None,
                signal: TrafficLight::Unknown,
                position_range: "—".to_string(),
                rules: vec![format!("insufficient data for MA{long}")],
            };
        }

        let n = closes.len();
        let close = closes[n - 1];
        let ma_short_val = mean(&closes[n - short..]);
        let ma_long_val = mean(&closes[n - long..]);
        let ma_long_prev = mean(&closes[n - long - 1..n - 1]);

        let mut rules = Vec::new();
        let (signal, position_range) = if close > ma_long_val && ma_long_val > ma_long_prev {
            rules.push(format!("close>MA{long} && MA{long} up"));
            (TrafficLight::Green, "80%-100%")
        } else if close < ma_long_val && ma_long_val < ma_long_prev {
            rules.push(format!("close<MA{long} && MA{long} down"));
            (TrafficLight::Red, "0%-20%")
        } else {
            if close < ma_short_val && close >= ma_long_val {
                rules.push(format!("close<MA{short} but hold MA{long}"));
            } else if ma_long_val > 0.0
                && ((close - ma_long_val).abs() / ma_long_val) <= self.config.near_ma_tolerance
            {
                rules.push(format!("close near MA{long}"));
            } else {
                rules.push("range/sideways".to_string());
            }
            (TrafficLight::Yellow, "40%-50%")
        };

        IndexSignal {
            symbol: series.symbol().to_string(),
            name: index.name.clone(),
            as_of: last_date,
            close: Some(close),
            ma_short: Some(ma_short_val),
            ma_long: Some(ma_long_val),
            ma_long_prev: Some(ma_long_prev),
            signal,
            position_range: position_range.to_string(),
            rules,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Combine the first two index signals into the market regime.
fn combine_signals(signals: &[IndexSignal]) -> (Regime, Option<RegimeBias>) {
    if signals.len() < 2 {
        return (Regime::Weak, None);
    }
    let first = &signals[0];
    let second = &signals[1];
    let g1 = first.signal == TrafficLight::Green;
    let g2 = second.signal == TrafficLight::Green;
    if g1 && g2 {
        return (Regime::Strong, None);
    }
    if g1 || g2 {
        let r1 = first.signal.rank();
        let r2 = second.signal.rank();
        if r1 == r2 {
            return (Regime::Diverging, Some(RegimeBias::Mixed));
        }
        let leader = if r1 > r2 { &first.symbol } else { &second.symbol };
        return (Regime::Diverging, Some(RegimeBias::Leader(leader.clone())));
    }
    (Regime::Weak, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use chrono::Duration;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;

    fn index_series(symbol: &str, closes: &[f64]) -> BarSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let px = Decimal::from_f64(c).unwrap();
                Bar::from_ohlcv(
                    symbol,
                    base + Duration::days(i as i64),
                    px,
                    px,
                    px,
                    px,
                    Decimal::from(1000),
                    Decimal::from(10000),
                )
            })
            .collect();
        BarSeries::from_bars(symbol, bars).unwrap()
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - i as f64).collect()
    }

    fn classifier(a: &[f64], b: &[f64]) -> RegimeClassifier {
        RegimeClassifier::new(
            vec![
                ("SSE Composite".into(), index_series("000001.SH", a)),
                ("ChiNext".into(), index_series("399006.SZ", b)),
            ],
            RegimeConfig::default(),
        )
    }

    #[test]
    fn both_rising_is_strong() {
        let r = classifier(&rising(30), &rising(30)).classify(None);
        assert_eq!(r.regime, Regime::Strong);
        assert!(r.bias.is_none());
    }

    #[test]
    fn both_falling_is_weak() {
        let r = classifier(&falling(30), &falling(30)).classify(None);
        assert_eq!(r.regime, Regime::Weak);
    }

    #[test]
    fn split_market_is_diverging_with_leader() {
        let r = classifier(&rising(30), &falling(30)).classify(None);
        assert_eq!(r.regime, Regime::Diverging);
        assert_eq!(r.bias, Some(RegimeBias::Leader("000001.SH".into())));
    }

    #[test]
    fn insufficient_data_is_unknown() {
        let r = classifier(&rising(5), &rising(5)).classify(None);
        assert_eq!(r.regime, Regime::Unknown);
        assert!(r
            .index_signals
            .iter()
            .all(|s| s.signal == TrafficLight::Unknown));
    }

    #[test]
    fn no_indexes_is_unknown() {
        let c = RegimeClassifier::new(Vec::new(), RegimeConfig::default());
        assert_eq!(c.classify(None).regime, Regime::Unknown);
    }

    #[test]
    fn as_of_restricts_history() {
        // Rising through day 30, then crashes; as-of day 25 should still be green.
        let mut closes = rising(26);
        closes.extend_from_slice(&[50.0, 45.0, 40.0, 35.0]);
        let c = classifier(&closes, &closes);
        let cutoff = NaiveDate::from_ymd_opt(2024, 1, 26).unwrap();
        assert_eq!(c.classify(Some(cutoff)).regime, Regime::Strong);
        assert_ne!(c.classify(None).regime, Regime::Strong);
    }

    #[test]
    fn classification_is_deterministic() {
        let c = classifier(&rising(30), &falling(30));
        assert_eq!(c.classify(None), c.classify(None));
    }
}
