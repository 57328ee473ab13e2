// 🏆 Insight Ranker - Drivers and pain points per bank
//
// Drivers:     avg_sentiment desc, count desc, theme asc
// Pain points: avg_sentiment asc,  count desc, theme asc
//
// The two lists are independent; a theme can be in both.

use crate::aggregator::ThemeAggregate;
use crate::review::Bank;
use crate::themes::ThemeCatalog;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_TOP_K: usize = 3;

/// Cap on recommendations per bank
pub const MAX_RECOMMENDATIONS: usize = 6;

/// Actions taken from each pain-point theme
const ACTIONS_PER_THEME: usize = 2;

const FALLBACK_RECOMMENDATIONS: [&str; 2] = [
    "Investigate the top negative themes and collect telemetry (logs, metrics, user flows).",
    "Prioritize quick fixes that reduce user friction and measure their impact.",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankInsight {
    pub bank: Bank,
    pub top_drivers: Vec<ThemeAggregate>,
    pub top_pain_points: Vec<ThemeAggregate>,
    pub recommendations: Vec<String>,
}

impl BankInsight {
    pub fn empty(bank: Bank) -> Self {
        BankInsight {
            bank,
            top_drivers: Vec::new(),
            top_pain_points: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

fn driver_order(a: &ThemeAggregate, b: &ThemeAggregate) -> Ordering {
    b.avg_sentiment
        .total_cmp(&a.avg_sentiment)
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| a.theme.cmp(&b.theme))
}

fn pain_point_order(a: &ThemeAggregate, b: &ThemeAggregate) -> Ordering {
    a.avg_sentiment
        .total_cmp(&b.avg_sentiment)
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| a.theme.cmp(&b.theme))
}

pub struct InsightRanker {
    pub top_k: usize,
}

impl InsightRanker {
    pub fn new(top_k: usize) -> Self {
        InsightRanker { top_k }
    }

    pub fn top_drivers(&self, aggregates: &[ThemeAggregate]) -> Vec<ThemeAggregate> {
        self.top_by(aggregates, driver_order)
    }

    pub fn top_pain_points(&self, aggregates: &[ThemeAggregate]) -> Vec<ThemeAggregate> {
        self.top_by(aggregates, pain_point_order)
    }

    fn top_by(
        &self,
        aggregates: &[ThemeAggregate],
        order: fn(&ThemeAggregate, &ThemeAggregate) -> Ordering,
    ) -> Vec<ThemeAggregate> {
        let mut ranked = aggregates.to_vec();
        ranked.sort_by(order);
        ranked.truncate(self.top_k);
        ranked
    }

    /// Rank one bank's surviving aggregates. No recommendations attached.
    pub fn rank(&self, bank: Bank, aggregates: &[ThemeAggregate]) -> BankInsight {
        BankInsight {
            bank,
            top_drivers: self.top_drivers(aggregates),
            top_pain_points: self.top_pain_points(aggregates),
            recommendations: Vec::new(),
        }
    }

    /// Rank and attach recommendations derived from the pain points
    pub fn rank_with_actions(
        &self,
        bank: Bank,
        aggregates: &[ThemeAggregate],
        catalog: &ThemeCatalog,
    ) -> BankInsight {
        let mut insight = self.rank(bank, aggregates);
        insight.recommendations = recommend(&insight.top_pain_points, catalog);
        insight
    }
}

impl Default for InsightRanker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

/// Up to two actions per pain point in rank order, de-duplicated, capped.
/// Falls back to generic advice when no pain point has actions.
pub fn recommend(pain_points: &[ThemeAggregate], catalog: &ThemeCatalog) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for pain in pain_points {
        for action in catalog.actions_for(&pain.theme).iter().take(ACTIONS_PER_THEME) {
            if out.len() >= MAX_RECOMMENDATIONS {
                return out;
            }
            if !out.contains(action) {
                out.push(action.clone());
            }
        }
    }

    if out.is_empty() {
        out = FALLBACK_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect();
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
