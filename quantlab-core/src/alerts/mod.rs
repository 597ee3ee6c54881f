//! Live watchlist analysis — read-only plans for human review.

pub mod momentum;

pub use momentum::{
    compute_watchlist_momentum_plan, HoldingAction, HoldingRow, MomentumPlan, MomentumSummary,
    WatchlistEntry,
};
