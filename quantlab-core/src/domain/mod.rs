//! Domain types — bars, series, portfolio, orders, regime, trend decisions.

pub mod bar;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod regime;
pub mod score;
pub mod series;
pub mod trend;

pub use bar::Bar;
pub use order::{Order, OrderAction, OrderSize};
pub use portfolio::PortfolioSnapshot;
pub use position::Position;
pub use regime::{IndexSignal, MarketRegime, Regime, RegimeBias, TrafficLight};
pub use score::ScoreConfig;
pub use series::{BarSeries, SeriesError};
pub use trend::{BuyAction, BuyAdvice, BuyMode, StopLossReport, TrendChecks, TrendDecision, TrendReport};
