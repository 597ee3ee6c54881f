//! MACD — trend-momentum oscillator.
//!
//! macd line = EMA(fast) - EMA(slow); signal line = EMA(macd, signal);
//! histogram = macd - signal. All three outputs are aligned to the input.

use super::ema::ema;

/// Returns `(macd_line, signal_line, histogram)`, each the input's length,
/// or three empty vectors on empty input.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    if values.is_empty() {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(a, b)| a - b)
        .collect();
    let signal_line = ema(&macd_line, signal);
    let hist: Vec<f64> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();
    (macd_line, signal_line, hist)
}
