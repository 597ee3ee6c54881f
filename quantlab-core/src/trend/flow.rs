//! Industry money-flow context — sector rotation adjustments for trend scores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Threshold below which a day's net flow counts as a large outflow (CNY).
const LARGE_OUTFLOW: f64 = -1.0e8;

/// One industry's net inflow for one day, as the data layer records it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryFlowRow {
    pub date: NaiveDate,
    pub industry: String,
    pub net_inflow: f64,
}

/// A score delta with its named parts and reason tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowAdjustment {
    pub delta: f64,
    pub parts: BTreeMap<String, f64>,
    pub reasons: Vec<String>,
}

/// Rolling view of industry fund flows as of a date.
///
/// Hotspot membership (today's and yesterday's top inflows, 5-day leaders and
/// laggards) is precomputed once so per-symbol adjustments are cheap lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct IndustryFlowContext {
    as_of: NaiveDate,
    top_today_3: BTreeSet<String>,
    top_today_5: BTreeSet<String>,
    top_yesterday_3: BTreeSet<String>,
    net_today: BTreeMap<String, f64>,
    net_yesterday: BTreeMap<String, f64>,
    top_5d_3: BTreeSet<String>,
    bottom_5d_5: BTreeSet<String>,
}

impl IndustryFlowContext {
    /// Build the context from raw daily rows. Returns `None` when no rows are
    /// on or before `as_of` — callers score without a flow adjustment.
    pub fn from_rows(rows: &[IndustryFlowRow], as_of: NaiveDate) -> Option<Self> {
        let mut dates: Vec<NaiveDate> = rows
            .iter()
            .filter(|r| r.date <= as_of)
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let today = *dates.last()?;
        let yesterday = dates.iter().rev().nth(1).copied();
        let dates_5: Vec<NaiveDate> = dates.split_off(dates.len().saturating_sub(5));

        let ranked = |date: NaiveDate| -> Vec<(String, f64)> {
            let mut day: Vec<(String, f64)> = rows
                .iter()
                .filter(|r| r.date == date)
                .map(|r| (r.industry.clone(), r.net_inflow))
                .collect();
            day.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            day
        };

        let rows_today = ranked(today);
        let rows_yesterday = yesterday.map(ranked).unwrap_or_default();

        let names = |rows: &[(String, f64)], n: usize| -> BTreeSet<String> {
            rows.iter().take(n).map(|(name, _)| name.clone()).collect()
        };

        let mut sums_5d: BTreeMap<String, f64> = BTreeMap::new();
        for r in rows.iter().filter(|r| dates_5.contains(&r.date)) {
            *sums_5d.entry(r.industry.clone()).or_default() += r.net_inflow;
        }
        let mut sums_ranked: Vec<(String, f64)> = sums_5d.into_iter().collect();
        sums_ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        let top_5d_3 = names(&sums_ranked, 3);
        let bottom_5d_5: BTreeSet<String> = sums_ranked
            .iter()
            .rev()
            .take(5)
            .map(|(name, _)| name.clone())
            .collect();

        Some(Self {
            as_of: today,
            top_today_3: names(&rows_today, 3),
            top_today_5: names(&rows_today, 5),
            top_yesterday_3: names(&rows_yesterday, 3),
            net_today: rows_today.into_iter().collect(),
            net_yesterday: rows_yesterday.into_iter().collect(),
            top_5d_3,
            bottom_5d_5,
        })
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Score adjustment for one industry.
    pub fn score_adjustment(&self, industry: &str) -> FlowAdjustment {
        let mut adj = FlowAdjustment::default();
        if industry.is_empty() {
            return adj;
        }
        let mut apply = |points: f64, tag: &str| {
            adj.delta += points;
            adj.parts.insert(tag.to_string(), points);
            adj.reasons.push(tag.to_string());
        };

        // 5-day flow ranking
        if self.top_5d_3.contains(industry) {
            apply(10.0, "industry_flow_5d_top3");
        }
        if self.bottom_5d_5.contains(industry) {
            apply(-20.0, "industry_flow_5d_bottom5");
        }

        // Today's hotspots (top inflow)
        if self.top_today_3.contains(industry) {
            apply(5.0, "hotspots_today_top3");
        } else if self.top_today_5.contains(industry) {
            apply(3.0, "hotspots_today_top4_5");
        }

        let today_inflow = self.net_today.get(industry).copied().unwrap_or(0.0);
        let yesterday_inflow = self.net_yesterday.get(industry).copied().unwrap_or(0.0);
        let in_hot_today = self.top_today_5.contains(industry);

        // Yesterday's leader falling out of the hotspots on a large outflow.
        if self.top_yesterday_3.contains(industry)
            && !in_hot_today
            && today_inflow <= LARGE_OUTFLOW
        {
            apply(-15.0, "hotspot_falloff_big_outflow");
        }

        // Two consecutive days of large outflow outside the hotspots.
        if !in_hot_today && today_inflow <= LARGE_OUTFLOW && yesterday_inflow <= LARGE_OUTFLOW {
            apply(-10.0, "hotspot_absent_2d_big_outflow");
        }

        adj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn rows() -> Vec<IndustryFlowRow> {
        let mut out = Vec::new();
        // Six industries across five days; "semis" always leads, "coal" always lags.
        for d in 1..=5 {
            for (industry, net) in [
                ("semis", 5.0e8),
                ("ai", 3.0e8),
                ("banks", 1.0e8),
                ("autos", 0.5e8),
                ("steel", -2.0e8),
                ("coal", -6.0e8),
            ] {
                out.push(IndustryFlowRow {
                    date: date(d),
                    industry: industry.to_string(),
                    net_inflow: net,
                });
            }
        }
        out
    }

    #[test]
    fn context_requires_rows_on_or_before_as_of() {
        assert!(IndustryFlowContext::from_rows(&rows(), date(1)).is_some());
        assert!(IndustryFlowContext::from_rows(&rows(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).is_none());
    }

    #[test]
    fn leader_gets_positive_adjustment() {
        let ctx = IndustryFlowContext::from_rows(&rows(), date(5)).unwrap();
        let adj = ctx.score_adjustment("semis");
        // 5d top3 (+10) and today's top3 (+5)
        assert_eq!(adj.delta, 15.0);
        assert!(adj.reasons.contains(&"industry_flow_5d_top3".to_string()));
        assert!(adj.reasons.contains(&"hotspots_today_top3".to_string()));
    }

    #[test]
    fn laggard_gets_penalized() {
        let ctx = IndustryFlowContext::from_rows(&rows(), date(5)).unwrap();
        let adj = ctx.score_adjustment("coal");
        // 5d bottom5 (-20) and 2-day large outflow outside hotspots (-10).
        assert_eq!(adj.delta, -30.0);
    }

    #[test]
    fn unknown_industry_is_neutral() {
        let ctx = IndustryFlowContext::from_rows(&rows(), date(5)).unwrap();
        // Not in any ranking set and zero recorded flow: only possibly bottom5
        // membership could fire, and "media" was never recorded.
        let adj = ctx.score_adjustment("media");
        assert_eq!(adj.delta, 0.0);
        assert!(adj.reasons.is_empty());
    }

    #[test]
    fn empty_industry_is_neutral() {
        let ctx = IndustryFlowContext::from_rows(&rows(), date(5)).unwrap();
        assert_eq!(ctx.score_adjustment("").delta, 0.0);
    }
}
