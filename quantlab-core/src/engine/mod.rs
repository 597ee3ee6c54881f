//! Backtest engine — date loop, order application, equity accounting.

pub mod params;
pub mod result;
pub mod runner;

pub use params::{BacktestParams, ParamsError};
pub use result::{
    BacktestResult, DailyRecord, EquityPoint, OrderRecord, OrderStatus, RejectedOrder,
    SelectedCandidate, Summary, TradeRecord,
};
pub use runner::run_backtest;
