//! Universe membership and per-bar eligibility rules.

pub mod daily_rules;
pub mod universe;

pub use daily_rules::DailyRuleFilter;
pub use universe::{StockListing, UniverseCriteria, UniverseFilter};
