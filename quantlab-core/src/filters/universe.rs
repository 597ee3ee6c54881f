//! Universe filter — which symbols are tradable as of a date.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the listing reference table the data layer maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockListing {
    pub symbol: String,
    pub name: String,
    /// Exchange board (e.g. "main", "gem", "star").
    pub board: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

/// Membership criteria. Empty `boards` means all boards are eligible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniverseCriteria {
    #[serde(default)]
    pub boards: Vec<String>,
    /// Name substrings that disqualify a listing (e.g. "ST").
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    /// Minimum days since listing; newly listed names are excluded.
    #[serde(default)]
    pub min_list_days: i64,
}

/// Decides membership of the tradable symbol set as of a date.
///
/// Deterministic given the same listing table: the same `as_of` always
/// produces the same set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseFilter {
    listings: Vec<StockListing>,
    criteria: UniverseCriteria,
}

impl UniverseFilter {
    pub fn new(listings: Vec<StockListing>, criteria: UniverseCriteria) -> Self {
        Self { listings, criteria }
    }

    /// Criteria-free universe over a plain symbol list (tests, ad-hoc runs).
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let listings = symbols
            .into_iter()
            .map(|s| {
                let symbol = s.into();
                StockListing {
                    name: symbol.clone(),
                    symbol,
                    board: "main".to_string(),
                    list_date: None,
                    industry: None,
                }
            })
            .collect();
        Self::new(listings, UniverseCriteria::default())
    }

    /// Parse a universe (listing table + criteria) from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }

    pub fn listings(&self) -> &[StockListing] {
        &self.listings
    }

    /// Industry lookup for the trend evaluator's callers.
    pub fn industry_of(&self, symbol: &str) -> Option<&str> {
        self.listings
            .iter()
            .find(|l| l.symbol == symbol)
            .and_then(|l| l.industry.as_deref())
    }

    /// Tradable symbol set as of `as_of`.
    pub fn members(&self, as_of: NaiveDate) -> BTreeSet<String> {
        let min_days = self.criteria.min_list_days.max(0);
        self.listings
            .iter()
            .filter(|listing| {
                if !self.criteria.boards.is_empty()
                    && !self.criteria.boards.contains(&listing.board)
                {
                    return false;
                }
                if self
                    .criteria
                    .exclude_keywords
                    .iter()
                    .any(|kw| !kw.is_empty() && listing.name.contains(kw.as_str()))
                {
                    return false;
                }
                if min_days > 0 {
                    // Listings with an unknown list date cannot prove their age.
                    match listing.list_date {
                        None => return false,
                        Some(listed) => {
                            if listed > as_of - Duration::days(min_days) {
                                return false;
                            }
                        }
                    }
                }
                true
            })
            .map(|listing| listing.symbol.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(symbol: &str, name: &str, board: &str, listed: Option<(i32, u32, u32)>) -> StockListing {
        StockListing {
            symbol: symbol.into(),
            name: name.into(),
            board: board.into(),
            list_date: listed.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            industry: None,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn empty_table_yields_empty_set() {
        let u = UniverseFilter::default();
        assert!(u.members(as_of()).is_empty());
    }

    #[test]
    fn keyword_exclusion() {
        let u = UniverseFilter::new(
            vec![
                listing("000001", "平安银行", "main", None),
                listing("600001", "ST邯郸", "main", None),
            ],
            UniverseCriteria {
                exclude_keywords: vec!["ST".into()],
                ..Default::default()
            },
        );
        let members = u.members(as_of());
        assert!(members.contains("000001"));
        assert!(!members.contains("600001"));
    }

    #[test]
    fn board_restriction() {
        let u = UniverseFilter::new(
            vec![
                listing("000001", "A", "main", None),
                listing("300001", "B", "gem", None),
            ],
            UniverseCriteria {
                boards: vec!["main".into()],
                ..Default::default()
            },
        );
        assert_eq!(u.members(as_of()).len(), 1);
    }

    #[test]
    fn min_list_days_excludes_recent_ipos() {
        let u = UniverseFilter::new(
            vec![
                listing("000001", "A", "main", Some((2020, 1, 1))),
                listing("301500", "B", "main", Some((2024, 5, 20))),
                listing("301501", "C", "main", None),
            ],
            UniverseCriteria {
                min_list_days: 60,
                ..Default::default()
            },
        );
        let members = u.members(as_of());
        assert_eq!(members.len(), 1);
        assert!(members.contains("000001"));
    }

    #[test]
    fn toml_roundtrip() {
        let u = UniverseFilter::new(
            vec![listing("000001", "平安银行", "main", Some((2020, 1, 1)))],
            UniverseCriteria {
                exclude_keywords: vec!["ST".into()],
                min_list_days: 60,
                ..Default::default()
            },
        );
        let toml_str = u.to_toml().unwrap();
        let parsed = UniverseFilter::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.listings().len(), 1);
        assert_eq!(parsed.members(as_of()), u.members(as_of()));
    }

    #[test]
    fn membership_is_deterministic() {
        let u = UniverseFilter::from_symbols(["000001", "600519"]);
        assert_eq!(u.members(as_of()), u.members(as_of()));
        assert_eq!(u.members(as_of()).len(), 2);
    }
}
