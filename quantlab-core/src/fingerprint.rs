//! Run fingerprint — a stable hash identifying a backtest's full inputs.
//!
//! Identical params + data always produce an identical result, so equal
//! fingerprints across runs are a cheap reproducibility audit.

use crate::data::market::MarketData;
use crate::engine::params::BacktestParams;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint(pub String);

impl fmt::Display for RunFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct FingerprintPayload<'a> {
    strategy: &'a str,
    params: &'a BacktestParams,
    symbols: Vec<&'a str>,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    bar_count: usize,
}

/// Hash the run's identity: strategy name, params, and the data's shape.
pub fn fingerprint_run(
    strategy: &str,
    params: &BacktestParams,
    data: &MarketData,
) -> RunFingerprint {
    let payload = FingerprintPayload {
        strategy,
        params,
        symbols: data.symbols().iter().map(|s| s.as_str()).collect(),
        first_date: data.first_date(),
        last_date: data.last_date(),
        bar_count: data.bar_count(),
    };
    // Plain data structs with no custom serializers cannot fail here.
    let bytes = serde_json::to_vec(&payload).expect("fingerprint payload serializes");
    RunFingerprint(blake3::hash(&bytes).to_hex().to_string())
}
