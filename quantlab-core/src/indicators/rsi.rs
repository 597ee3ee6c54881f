//! RSI — bounded strength oscillator, output in [0, 100].
//!
//! Wilder smoothing with a growing-window average over the first `period`
//! deltas. Index 0 is 0.0 (no delta yet). Fewer than two values yields an
//! empty result.

/// RSI over a value series.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < 2 {
        return Vec::new();
    }
    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());
    gains.push(0.0);
    losses.push(0.0);
    for i in 1..values.len() {
        let chg = values[i] - values[i - 1];
        gains.push(chg.max(0.0));
        losses.push((-chg).max(0.0));
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut out = vec![0.0; values.len()];
    for i in 1..values.len() {
        if i <= period {
            let n = i as f64;
            avg_gain = gains[1..=i].iter().sum::<f64>() / n.max(1.0);
            avg_loss = losses[1..=i].iter().sum::<f64>() / n.max(1.0);
        } else {
            avg_gain = (avg_gain * (period as f64 - 1.0) + gains[i]) / period as f64;
            avg_loss = (avg_loss * (period as f64 - 1.0) + losses[i]) / period as f64;
        }
        out[i] = if avg_loss <= 0.0 {
            if avg_gain > 0.0 {
                100.0
            } else {
                50.0
            }
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
    }
    out
}
