// 🔗 Review Enricher - raw review + sentiment + themes → enriched review
//
// Per-review work is pure, so the batch runs on rayon and keeps input order.

use crate::error::{InsightError, InsightResult};
use crate::normalizer::{normalize, NormalizedText};
use crate::review::{Bank, RawReview};
use crate::sentiment::{SentimentAnnotation, SentimentTable};
use crate::themes::{ThemeClassifier, ThemeMatch};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

// ============================================================================
// ENRICHED REVIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedReview {
    pub review: RawReview,
    pub sentiment: SentimentAnnotation,
    pub normalized_text: NormalizedText,
    /// Catalog order; empty when nothing matched
    pub matched_themes: Vec<ThemeMatch>,
}

impl EnrichedReview {
    pub fn new(
        review: RawReview,
        sentiment: SentimentAnnotation,
        normalized_text: NormalizedText,
        matched_themes: Vec<ThemeMatch>,
    ) -> Self {
        EnrichedReview {
            review,
            sentiment,
            normalized_text,
            matched_themes,
        }
    }

    pub fn review_id(&self) -> &str {
        &self.review.review_id
    }

    pub fn bank(&self) -> Bank {
        self.review.bank
    }

    /// Signed sentiment score
    pub fn score(&self) -> f64 {
        self.sentiment.score
    }

    /// Nothing left to match after normalization
    pub fn is_unclassifiable(&self) -> bool {
        self.normalized_text.is_empty()
    }

    pub fn has_theme(&self, theme: &str) -> bool {
        self.matched_themes.iter().any(|m| m.theme == theme)
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.matched_themes.iter().map(|m| m.theme.as_str())
    }
}

// ============================================================================
// MISSING ANNOTATION POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAnnotationPolicy {
    /// Leave the review out of theme aggregates, keep it in bank totals, warn
    #[default]
    Skip,
    /// Fail the whole run on the first missing annotation
    Abort,
}

// ============================================================================
// BATCH OUTPUT
// ============================================================================

/// Everything the aggregator needs from one enrichment pass
#[derive(Debug, Clone, Default)]
pub struct EnrichmentBatch {
    pub enriched: Vec<EnrichedReview>,
    /// Reviews skipped for lack of sentiment; still part of bank totals
    pub unannotated: Vec<RawReview>,
}

impl EnrichmentBatch {
    /// Reviews per bank (annotated or not). Every known bank has an entry.
    pub fn bank_totals(&self) -> BTreeMap<Bank, usize> {
        let mut totals: BTreeMap<Bank, usize> = Bank::ALL.into_iter().map(|b| (b, 0)).collect();
        for bank in self
            .enriched
            .iter()
            .map(|r| r.bank())
            .chain(self.unannotated.iter().map(|r| r.bank))
        {
            *totals.entry(bank).or_insert(0) += 1;
        }
        totals
    }

    pub fn len(&self) -> usize {
        self.enriched.len() + self.unannotated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// ENRICHER
// ============================================================================

pub struct Enricher<'a> {
    classifier: &'a dyn ThemeClassifier,
    policy: MissingAnnotationPolicy,
}

impl<'a> Enricher<'a> {
    pub fn new(classifier: &'a dyn ThemeClassifier, policy: MissingAnnotationPolicy) -> Self {
        Enricher { classifier, policy }
    }

    /// Merge one review with its annotation and classifier output
    pub fn enrich(
        &self,
        review: RawReview,
        sentiments: &SentimentTable,
    ) -> InsightResult<EnrichedReview> {
        self.try_enrich(review, sentiments)
            .map_err(|review| InsightError::MissingAnnotation {
                review_id: review.review_id,
            })
    }

    /// Like `enrich`, but hands the review back untouched when it has no annotation
    pub fn try_enrich(
        &self,
        review: RawReview,
        sentiments: &SentimentTable,
    ) -> Result<EnrichedReview, RawReview> {
        let Some(sentiment) = sentiments.get(&review.review_id).copied() else {
            return Err(review);
        };

        let normalized = normalize(&review.review_text);
        let themes = self.classifier.classify(&normalized);

        Ok(EnrichedReview::new(review, sentiment, normalized, themes))
    }

    /// Enrich a whole run, applying the missing-annotation policy
    pub fn enrich_all(
        &self,
        reviews: Vec<RawReview>,
        sentiments: &SentimentTable,
    ) -> InsightResult<EnrichmentBatch> {
        let results: Vec<Result<EnrichedReview, RawReview>> = reviews
            .into_par_iter()
            .map(|review| self.try_enrich(review, sentiments))
            .collect();

        let mut batch = EnrichmentBatch::default();
        for result in results {
            match result {
                Ok(enriched) => batch.enriched.push(enriched),
                Err(review) => match self.policy {
                    MissingAnnotationPolicy::Abort => {
                        return Err(InsightError::MissingAnnotation {
                            review_id: review.review_id,
                        });
                    }
                    MissingAnnotationPolicy::Skip => {
                        warn!(
                            review_id = %review.review_id,
                            bank = %review.bank,
                            "no sentiment annotation, excluded from theme aggregates"
                        );
                        batch.unannotated.push(review);
                    }
                },
            }
        }

        let unclassifiable = batch.enriched.iter().filter(|r| r.is_unclassifiable()).count();
        info!(
            enriched = batch.enriched.len(),
            unannotated = batch.unannotated.len(),
            unclassifiable,
            "enrichment complete"
        );

        Ok(batch)
    }
}

// ============================================================================
// TESTS
// ============================================================================
