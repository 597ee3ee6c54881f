//! Indicator library — pure transforms over numeric series.
//!
//! All functions are deterministic and side-effect free, take exactly the
//! window the caller wants evaluated, and keep no cache between calls.
//! Insufficient history yields an empty (or shorter) result — never a panic.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use atr::atr_last;
pub use ema::ema;
pub use macd::macd;
pub use rsi::rsi;

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-9;
