//! Market regime classification and the exchange session calendar.

pub mod classifier;
pub mod session;

pub use classifier::{RegimeClassifier, RegimeConfig};
pub use session::{in_continuous_trading, in_session_window, in_session_window_utc, EXCHANGE_TZ};
