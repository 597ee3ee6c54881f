//! ScoreConfig — daily candidate ranking weights.

use serde::{Deserialize, Serialize};

/// Weights for the engine's daily top-N candidate ranking.
///
/// Score per bar: `momentum_weight * (close/prev_close - 1)
/// + volume_weight * ln(1 + volume) + amount_weight * ln(1 + amount)`.
/// Immutable per backtest run. These are ranking weights only; strategy
/// entry/exit thresholds live on the strategy constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub top_n: usize,
    pub momentum_weight: f64,
    pub volume_weight: f64,
    pub amount_weight: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            top_n: 1000,
            momentum_weight: 1.0,
            volume_weight: 0.0,
            amount_weight: 0.0,
        }
    }
}
