//! Trend rule evaluator and its money-flow context.

pub mod evaluator;
pub mod flow;

pub use evaluator::{evaluate_trend, TrendConfig, TrendInput};
pub use flow::{FlowAdjustment, IndustryFlowContext, IndustryFlowRow};
