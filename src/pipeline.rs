// 🧭 Insight Pipeline - reviews + sentiment → per-bank insight report
//
// normalize → classify → enrich → aggregate → rank → recommend

use crate::aggregator::{BankAggregates, BankAggregator, ThemeAggregate};
use crate::config::AnalysisConfig;
use crate::enricher::{EnrichmentBatch, Enricher};
use crate::error::InsightResult;
use crate::keywords::{TermExtractor, TopTerm};
use crate::ranker::{BankInsight, InsightRanker};
use crate::review::{Bank, RawReview};
use crate::sentiment::SentimentTable;
use crate::summary::{summarize, BankSummary};
use crate::themes::ThemeCatalog;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankReport {
    pub summary: BankSummary,
    pub insight: BankInsight,
    /// Every aggregate that passed min_count, largest first
    pub aggregates: Vec<ThemeAggregate>,
    /// TF-IDF keywords over all of the bank's reviews
    pub top_terms: Vec<TopTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub min_count: usize,
    pub top_k: usize,
    pub themes: Vec<String>,
    pub banks: BTreeMap<Bank, BankReport>,
}

impl InsightReport {
    pub fn bank(&self, bank: Bank) -> Option<&BankReport> {
        self.banks.get(&bank)
    }

    pub fn total_reviews(&self) -> usize {
        self.banks.values().map(|b| b.summary.total_reviews).sum()
    }

    /// Pretty JSON to disk
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
        info!(path = ?path, "report written");
        Ok(())
    }
}

/// Output of a full run: the report plus the enriched batch it was built from
pub struct PipelineOutput {
    pub report: InsightReport,
    pub batch: EnrichmentBatch,
}

pub struct InsightPipeline<'a> {
    catalog: &'a ThemeCatalog,
    config: &'a AnalysisConfig,
}

impl<'a> InsightPipeline<'a> {
    pub fn new(catalog: &'a ThemeCatalog, config: &'a AnalysisConfig) -> Self {
        InsightPipeline { catalog, config }
    }

    pub fn run(
        &self,
        reviews: Vec<RawReview>,
        sentiments: &SentimentTable,
    ) -> InsightResult<PipelineOutput> {
        self.config.validate()?;
        info!(
            reviews = reviews.len(),
            annotations = sentiments.len(),
            themes = self.catalog.len(),
            "starting analysis"
        );

        let enricher = Enricher::new(self.catalog, self.config.missing_annotation);
        let batch = enricher.enrich_all(reviews, sentiments)?;

        let aggregates = BankAggregator::new(self.config.min_count).aggregate_sharded(&batch);
        let summaries = summarize(&batch);
        let ranker = InsightRanker::new(self.config.top_k);
        let mut top_terms =
            TermExtractor::new(self.config.top_terms, self.config.min_df).extract_by_bank(&batch);

        let banks = Bank::ALL
            .into_iter()
            .map(|bank| {
                let bank_aggs = aggregates
                    .get(&bank)
                    .cloned()
                    .unwrap_or_else(|| BankAggregates::empty(bank));
                let summary = summaries
                    .get(&bank)
                    .cloned()
                    .unwrap_or_else(|| BankSummary::empty(bank));
                let insight = ranker.rank_with_actions(bank, &bank_aggs.aggregates, self.catalog);

                debug!(
                    bank = %bank,
                    aggregates = bank_aggs.aggregates.len(),
                    drivers = insight.top_drivers.len(),
                    pain_points = insight.top_pain_points.len(),
                    "bank ranked"
                );

                (
                    bank,
                    BankReport {
                        summary,
                        insight,
                        aggregates: bank_aggs.aggregates,
                        top_terms: top_terms.remove(&bank).unwrap_or_default(),
                    },
                )
            })
            .collect();

        let report = InsightReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            min_count: self.config.min_count,
            top_k: self.config.top_k,
            themes: self.catalog.rules().map(|r| r.theme.clone()).collect(),
            banks,
        };

        info!(run_id = %report.run_id, total_reviews = report.total_reviews(), "analysis complete");
        Ok(PipelineOutput { report, batch })
    }
}
