//! Market regime value types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Coarse market-trend category used to gate strategy aggressiveness.
///
/// `Unknown` is the mandatory neutral category for insufficient reference
/// data; strategies must treat it conservatively (no aggressive entries).
/// `Diverging` is the mixed state where only one reference index is in an
/// uptrend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Strong,
    Diverging,
    Weak,
    Unknown,
}

/// Which side of a diverging market is leading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeBias {
    Mixed,
    Leader(String),
}

/// Per-index traffic-light signal from the moving-average rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Green,
    Yellow,
    Red,
    Unknown,
}

impl TrafficLight {
    /// Ordering used when comparing two diverging indexes.
    pub fn rank(self) -> u8 {
        match self {
            TrafficLight::Green => 3,
            TrafficLight::Yellow => 2,
            TrafficLight::Red => 1,
            TrafficLight::Unknown => 0,
        }
    }
}

/// One reference index's classification snapshot, with the rule trace that
/// produced it and a suggested position range for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSignal {
    pub symbol: String,
    pub name: String,
    pub as_of: Option<NaiveDate>,
    pub close: Option<f64>,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub ma_long_prev: Option<f64>,
    pub signal: TrafficLight,
    pub position_range: String,
    pub rules: Vec<String>,
}

/// The classifier's full output: the combined regime, the date it was derived
/// for, and the per-index signals it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRegime {
    pub regime: Regime,
    pub bias: Option<RegimeBias>,
    pub as_of: Option<NaiveDate>,
    pub index_signals: Vec<IndexSignal>,
}

impl MarketRegime {
    /// Neutral result for when no reference data is available.
    pub fn unknown() -> Self {
        Self {
            regime: Regime::Unknown,
            bias: None,
            as_of: None,
            index_signals: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_light_ranks() {
        assert!(TrafficLight::Green.rank() > TrafficLight::Yellow.rank());
        assert!(TrafficLight::Yellow.rank() > TrafficLight::Red.rank());
        assert!(TrafficLight::Red.rank() > TrafficLight::Unknown.rank());
    }

    #[test]
    fn unknown_regime_is_empty() {
        let r = MarketRegime::unknown();
        assert_eq!(r.regime, Regime::Unknown);
        assert!(r.index_signals.is_empty());
    }
}
