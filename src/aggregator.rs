// 📊 Bank Aggregator - (bank, theme) roll-ups with significance filtering
//
// Map-reduce shape: each shard builds PartialAggregates (counts + score sums),
// partials merge by summing, and averages are only taken in finalize().
// Averaging per-shard averages would weight small shards like large ones.
//
// Example quote rule: the matching review with the most negative signed score,
// ties broken by review_id ascending.

use crate::enricher::{EnrichedReview, EnrichmentBatch};
use crate::review::{Bank, RawReview};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_MIN_COUNT: usize = 3;

/// Reviews per shard for the parallel path
pub const DEFAULT_SHARD_SIZE: usize = 2048;

/// Display width of a quote in console output, placeholder included
pub const QUOTE_WIDTH: usize = 240;

const QUOTE_PLACEHOLDER: &str = "…";

// ============================================================================
// THEME AGGREGATE (final row)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeAggregate {
    pub bank: Bank,
    pub theme: String,
    pub count: usize,
    /// count / all reviews for the bank * 100
    pub share_pct: f64,
    /// Mean signed sentiment over matching reviews
    pub avg_sentiment: f64,
    pub example_quote: String,
    pub example_review_id: String,
}

/// Collapse whitespace and cut at a word boundary so the result fits `width` chars.
///
/// Cut text ends with "…". A first word longer than the budget leaves only the placeholder.
pub fn shorten_quote(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(QUOTE_PLACEHOLDER.chars().count());
    let mut out = String::new();
    let mut len = 0;
    for word in words {
        let extra = word.chars().count() + usize::from(!out.is_empty());
        if len + extra > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        len += extra;
    }
    out.push_str(QUOTE_PLACEHOLDER);
    out
}

// ============================================================================
// QUOTE CANDIDATE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct QuoteCandidate {
    review_id: String,
    score: f64,
    text: String,
}

impl QuoteCandidate {
    fn from_review(review: &EnrichedReview) -> Self {
        QuoteCandidate {
            review_id: review.review_id().to_string(),
            score: review.score(),
            text: review.review.review_text.clone(),
        }
    }

    /// Lower score wins, then lower review_id
    fn rank(&self, other: &QuoteCandidate) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.review_id.cmp(&other.review_id))
    }

    fn pick(current: Option<QuoteCandidate>, challenger: QuoteCandidate) -> Option<QuoteCandidate> {
        match current {
            Some(existing) if existing.rank(&challenger) != Ordering::Greater => Some(existing),
            _ => Some(challenger),
        }
    }
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Running state for one (bank, theme) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeAccumulator {
    pub count: usize,
    pub sentiment_sum: f64,
    quote: Option<QuoteCandidate>,
}

impl ThemeAccumulator {
    pub fn add(&mut self, review: &EnrichedReview) {
        self.count += 1;
        self.sentiment_sum += review.score();
        self.quote = QuoteCandidate::pick(self.quote.take(), QuoteCandidate::from_review(review));
    }

    /// Combine two partials: counts and sums add, the better quote survives
    pub fn merge(&mut self, other: ThemeAccumulator) {
        self.count += other.count;
        self.sentiment_sum += other.sentiment_sum;
        if let Some(candidate) = other.quote {
            self.quote = QuoteCandidate::pick(self.quote.take(), candidate);
        }
    }

    /// Undefined for an empty accumulator
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sentiment_sum / self.count as f64)
        }
    }
}

// ============================================================================
// PARTIAL AGGREGATES (one shard)
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PartialAggregates {
    totals: BTreeMap<Bank, usize>,
    themed: BTreeMap<Bank, usize>,
    themes: BTreeMap<(Bank, String), ThemeAccumulator>,
}

impl PartialAggregates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an annotated review toward its bank and every matched theme
    pub fn observe(&mut self, review: &EnrichedReview) {
        let bank = review.bank();
        *self.totals.entry(bank).or_insert(0) += 1;

        if review.matched_themes.is_empty() {
            return;
        }
        *self.themed.entry(bank).or_insert(0) += 1;

        for theme in review.theme_names() {
            self.themes
                .entry((bank, theme.to_string()))
                .or_default()
                .add(review);
        }
    }

    /// Count a review toward its bank total only
    pub fn observe_unannotated(&mut self, review: &RawReview) {
        *self.totals.entry(review.bank).or_insert(0) += 1;
    }

    pub fn from_reviews(reviews: &[EnrichedReview]) -> Self {
        let mut partial = Self::new();
        for review in reviews {
            partial.observe(review);
        }
        partial
    }

    pub fn merge(mut self, other: PartialAggregates) -> Self {
        for (bank, n) in other.totals {
            *self.totals.entry(bank).or_insert(0) += n;
        }
        for (bank, n) in other.themed {
            *self.themed.entry(bank).or_insert(0) += n;
        }
        for (key, acc) in other.themes {
            self.themes.entry(key).or_default().merge(acc);
        }
        self
    }

    pub fn accumulator(&self, bank: Bank, theme: &str) -> Option<&ThemeAccumulator> {
        self.themes.get(&(bank, theme.to_string()))
    }

    /// Compute averages and shares, drop pairs below `min_count`.
    /// Every known bank is present in the output, even with no reviews.
    pub fn finalize(self, min_count: usize) -> BTreeMap<Bank, BankAggregates> {
        let mut out: BTreeMap<Bank, BankAggregates> = Bank::ALL
            .into_iter()
            .map(|bank| {
                (
                    bank,
                    BankAggregates {
                        bank,
                        total_reviews: self.totals.get(&bank).copied().unwrap_or(0),
                        themed_reviews: self.themed.get(&bank).copied().unwrap_or(0),
                        aggregates: Vec::new(),
                    },
                )
            })
            .collect();

        for ((bank, theme), acc) in self.themes {
            let Some(avg_sentiment) = acc.average() else {
                continue;
            };
            if acc.count < min_count {
                debug!(bank = %bank, theme = %theme, count = acc.count, min_count, "theme below min_count, dropped");
                continue;
            }

            let entry = out.entry(bank).or_insert_with(|| BankAggregates::empty(bank));
            let share_pct = if entry.total_reviews == 0 {
                0.0
            } else {
                acc.count as f64 / entry.total_reviews as f64 * 100.0
            };
            let (example_quote, example_review_id) = acc
                .quote
                .map(|q| (q.text, q.review_id))
                .unwrap_or_default();

            entry.aggregates.push(ThemeAggregate {
                bank,
                theme,
                count: acc.count,
                share_pct,
                avg_sentiment,
                example_quote,
                example_review_id,
            });
        }

        for bank_aggs in out.values_mut() {
            bank_aggs
                .aggregates
                .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.theme.cmp(&b.theme)));
        }

        out
    }
}

// ============================================================================
// BANK AGGREGATES
// ============================================================================

/// Surviving aggregates for one bank, largest themes first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAggregates {
    pub bank: Bank,
    /// Every review for the bank, including unclassifiable and unannotated ones
    pub total_reviews: usize,
    /// Annotated reviews with at least one theme
    pub themed_reviews: usize,
    pub aggregates: Vec<ThemeAggregate>,
}

impl BankAggregates {
    pub fn empty(bank: Bank) -> Self {
        BankAggregates {
            bank,
            total_reviews: 0,
            themed_reviews: 0,
            aggregates: Vec::new(),
        }
    }

    pub fn get(&self, theme: &str) -> Option<&ThemeAggregate> {
        self.aggregates.iter().find(|a| a.theme == theme)
    }
}

// ============================================================================
// BANK AGGREGATOR
// ============================================================================

pub struct BankAggregator {
    /// Minimum matching reviews for a (bank, theme) pair to be reported
    pub min_count: usize,

    /// Shard size for aggregate_sharded
    pub shard_size: usize,
}

impl BankAggregator {
    pub fn new(min_count: usize) -> Self {
        BankAggregator {
            min_count,
            shard_size: DEFAULT_SHARD_SIZE,
        }
    }

    pub fn with_shard_size(mut self, shard_size: usize) -> Self {
        self.shard_size = shard_size.max(1);
        self
    }

    /// Single-pass aggregation
    pub fn aggregate(&self, batch: &EnrichmentBatch) -> BTreeMap<Bank, BankAggregates> {
        let mut partial = PartialAggregates::from_reviews(&batch.enriched);
        for review in &batch.unannotated {
            partial.observe_unannotated(review);
        }
        partial.finalize(self.min_count)
    }

    /// Parallel aggregation over fixed-size shards.
    ///
    /// Shards are merged in input order so floating-point sums come out the
    /// same on every run.
    pub fn aggregate_sharded(&self, batch: &EnrichmentBatch) -> BTreeMap<Bank, BankAggregates> {
        let partials: Vec<PartialAggregates> = batch
            .enriched
            .par_chunks(self.shard_size.max(1))
            .map(PartialAggregates::from_reviews)
            .collect();

        let mut merged = partials
            .into_iter()
            .fold(PartialAggregates::new(), PartialAggregates::merge);
        for review in &batch.unannotated {
            merged.observe_unannotated(review);
        }

        let shards = batch.enriched.len().div_ceil(self.shard_size.max(1));
        debug!(shards, "sharded aggregation merged");
        merged.finalize(self.min_count)
    }
}

impl Default for BankAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_COUNT)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::sentiment::{SentimentAnnotation, SentimentLabel};
    use crate::themes::{
        ThemeCatalog, ThemeClassifier, ThemeMatch, ACCOUNT_ACCESS, CUSTOMER_SUPPORT,
        TRANSACTION_PERFORMANCE, USER_INTERFACE,
    };
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn enriched(id: &str, bank: Bank, text: &str, score: f64) -> EnrichedReview {
        let catalog = ThemeCatalog::default_catalog();
        let normalized = normalize(text);
        let themes = catalog.classify(&normalized);
        EnrichedReview::new(
            RawReview::new(
                id,
                bank,
                text,
                3,
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                "Google Play",
            ),
            SentimentAnnotation::signed(SentimentLabel::from_signed(score), score).unwrap(),
            normalized,
            themes,
        )
    }

    fn with_themes(id: &str, bank: Bank, themes: &[&str], score: f64) -> EnrichedReview {
        let mut review = enriched(id, bank, "placeholder", score);
        review.matched_themes = themes
            .iter()
            .map(|t| ThemeMatch {
                theme: t.to_string(),
                keywords: BTreeSet::from(["kw".to_string()]),
            })
            .collect();
        review
    }

    fn batch(reviews: Vec<EnrichedReview>) -> EnrichmentBatch {
        EnrichmentBatch {
            enriched: reviews,
            unannotated: Vec::new(),
        }
    }

    fn dashen_scenario() -> EnrichmentBatch {
        batch(vec![
            enriched("d1", Bank::Dashen, "slow transfer", -0.7),
            enriched("d2", Bank::Dashen, "slow transfer", -0.6),
            enriched("d3", Bank::Dashen, "great ui", 0.9),
            enriched("d4", Bank::Dashen, "crash on login", -0.8),
            enriched("d5", Bank::Dashen, "crash on login", -0.5),
        ])
    }

    #[test]
    fn test_dashen_scenario() {
        let out = BankAggregator::new(2).aggregate(&dashen_scenario());
        let dashen = &out[&Bank::Dashen];

        assert_eq!(dashen.total_reviews, 5);

        let tp = dashen.get(TRANSACTION_PERFORMANCE).unwrap();
        assert_eq!(tp.count, 2);
        assert!((tp.avg_sentiment - -0.65).abs() < 1e-9);
        assert!((tp.share_pct - 40.0).abs() < 1e-9);

        let access = dashen.get(ACCOUNT_ACCESS).unwrap();
        assert_eq!(access.count, 2);
        assert!((access.avg_sentiment - -0.65).abs() < 1e-9);

        // Single review, below min_count
        assert!(dashen.get(USER_INTERFACE).is_none());
    }

    #[test]
    fn test_every_bank_present_even_without_reviews() {
        let out = BankAggregator::new(2).aggregate(&dashen_scenario());
        assert_eq!(out.len(), 3);
        assert_eq!(out[&Bank::Cbe].total_reviews, 0);
        assert!(out[&Bank::Cbe].aggregates.is_empty());
        assert!(out[&Bank::Boa].aggregates.is_empty());

        let empty = BankAggregator::default().aggregate(&EnrichmentBatch::default());
        assert_eq!(empty.len(), 3);
    }

    #[test]
    fn test_multi_theme_review_counts_once_per_theme() {
        let reviews = vec![enriched(
            "c1",
            Bank::Cbe,
            "customer service could not fix my slow transfer",
            -0.4,
        )];
        let out = BankAggregator::new(1).aggregate(&batch(reviews));
        let cbe = &out[&Bank::Cbe];

        assert_eq!(cbe.get(CUSTOMER_SUPPORT).unwrap().count, 1);
        assert_eq!(cbe.get(TRANSACTION_PERFORMANCE).unwrap().count, 1);
        assert_eq!(cbe.themed_reviews, 1);
        // 100% each: multi-label shares may sum past 100
        let share_sum: f64 = cbe.aggregates.iter().map(|a| a.share_pct).sum();
        assert!((share_sum - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_unthemed_reviews_only_affect_denominator() {
        let reviews = vec![
            with_themes("b1", Bank::Boa, &["X"], -0.2),
            with_themes("b2", Bank::Boa, &["X"], -0.4),
            with_themes("b3", Bank::Boa, &[], 0.9),
            with_themes("b4", Bank::Boa, &[], 0.9),
        ];
        let out = BankAggregator::new(1).aggregate(&batch(reviews));
        let boa = &out[&Bank::Boa];

        assert_eq!(boa.aggregates.len(), 1);
        let x = boa.get("X").unwrap();
        assert_eq!(x.count, 2);
        assert!((x.share_pct - 50.0).abs() < 1e-9);
        assert!((x.avg_sentiment - -0.3).abs() < 1e-9);
        assert!(x.example_review_id == "b1" || x.example_review_id == "b2");
        assert_ne!(x.example_review_id, "b3");
        assert_ne!(x.example_review_id, "b4");
    }

    #[test]
    fn test_unannotated_reviews_count_toward_share_denominator() {
        let mut b = batch(vec![
            with_themes("b1", Bank::Boa, &["X"], -0.2),
            with_themes("b2", Bank::Boa, &["X"], -0.4),
        ]);
        b.unannotated.push(RawReview::new(
            "b3",
            Bank::Boa,
            "slow",
            1,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            "Google Play",
        ));
        let out = BankAggregator::new(1).aggregate(&b);
        let x = out[&Bank::Boa].get("X").unwrap();
        assert_eq!(x.count, 2);
        assert!((x.share_pct - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_count_filter_law() {
        let mut reviews = Vec::new();
        for i in 0..5 {
            reviews.push(with_themes(&format!("a{}", i), Bank::Cbe, &["Big"], -0.1));
        }
        for i in 0..2 {
            reviews.push(with_themes(&format!("s{}", i), Bank::Cbe, &["Small"], -0.9));
        }
        for min_count in 1..=6 {
            let out = BankAggregator::new(min_count).aggregate(&batch(reviews.clone()));
            for bank_aggs in out.values() {
                assert!(bank_aggs.aggregates.iter().all(|a| a.count >= min_count));
            }
        }
        let out = BankAggregator::new(3).aggregate(&batch(reviews));
        let names: Vec<&str> = out[&Bank::Cbe]
            .aggregates
            .iter()
            .map(|a| a.theme.as_str())
            .collect();
        assert_eq!(names, vec!["Big"]);
    }

    #[test]
    fn test_example_quote_most_negative_then_review_id() {
        let reviews = vec![
            with_themes("r3", Bank::Cbe, &["X"], -0.9),
            with_themes("r1", Bank::Cbe, &["X"], -0.2),
            with_themes("r2", Bank::Cbe, &["X"], -0.9),
        ];
        let out = BankAggregator::new(1).aggregate(&batch(reviews));
        assert_eq!(out[&Bank::Cbe].get("X").unwrap().example_review_id, "r2");
    }

    #[test]
    fn test_example_quote_is_original_text() {
        let reviews = vec![enriched("q1", Bank::Cbe, "Login <b>FAILED</b>!!!", -0.9)];
        let out = BankAggregator::new(1).aggregate(&batch(reviews));
        assert_eq!(
            out[&Bank::Cbe].get(ACCOUNT_ACCESS).unwrap().example_quote,
            "Login <b>FAILED</b>!!!"
        );
    }

    #[test]
    fn test_shorten_quote() {
        assert_eq!(shorten_quote("  Slow\n transfer  ", QUOTE_WIDTH), "Slow transfer");
        assert_eq!(shorten_quote("login fails every single time", 16), "login fails…");
        assert_eq!(shorten_quote("unbelievably", 5), "…");

        let long = "word ".repeat(100);
        let short = shorten_quote(&long, QUOTE_WIDTH);
        assert!(short.chars().count() <= QUOTE_WIDTH);
        assert!(short.ends_with("word…"));
    }

    #[test]
    fn test_sum_of_counts_at_least_themed_reviews() {
        let reviews = vec![
            enriched("1", Bank::Cbe, "slow transfer and bad customer service", -0.5),
            enriched("2", Bank::Cbe, "login otp never arrives", -0.7),
            enriched("3", Bank::Cbe, "nice", 0.8),
        ];
        let out = BankAggregator::new(1).aggregate(&batch(reviews));
        let cbe = &out[&Bank::Cbe];
        let counted: usize = cbe.aggregates.iter().map(|a| a.count).sum();
        assert!(counted >= cbe.themed_reviews);
        assert_eq!(cbe.themed_reviews, 2);
        assert_eq!(counted, 3);
    }

    #[test]
    fn test_merge_sums_not_averages() {
        // Shard A: 1 review at -1.0, shard B: 3 reviews at +1.0
        let shard_a = PartialAggregates::from_reviews(&[with_themes("a", Bank::Cbe, &["X"], -1.0)]);
        let shard_b = PartialAggregates::from_reviews(&[
            with_themes("b1", Bank::Cbe, &["X"], 1.0),
            with_themes("b2", Bank::Cbe, &["X"], 1.0),
            with_themes("b3", Bank::Cbe, &["X"], 1.0),
        ]);

        let naive = (shard_a.accumulator(Bank::Cbe, "X").unwrap().average().unwrap()
            + shard_b.accumulator(Bank::Cbe, "X").unwrap().average().unwrap())
            / 2.0;
        assert_eq!(naive, 0.0);

        let merged = shard_a.merge(shard_b).finalize(1);
        let x = merged[&Bank::Cbe].get("X").unwrap();
        assert_eq!(x.count, 4);
        assert!((x.avg_sentiment - 0.5).abs() < 1e-12);
        assert_eq!(x.example_review_id, "a");
    }

    #[test]
    fn test_sharded_matches_sequential() {
        let texts = [
            "slow transfer",
            "login failed again",
            "support never answers",
            "great ui but slow",
            "please add dark mode",
            "👍",
        ];
        let mut reviews = Vec::new();
        for i in 0..97 {
            let bank = Bank::ALL[i % 3];
            let score = ((i * 37) % 21) as f64 / 10.0 - 1.0;
            reviews.push(enriched(&format!("r{:03}", i), bank, texts[i % texts.len()], score));
        }
        let b = batch(reviews);

        let sequential = BankAggregator::new(3).aggregate(&b);
        let sharded = BankAggregator::new(3).with_shard_size(7).aggregate_sharded(&b);

        for bank in Bank::ALL {
            let s = &sequential[&bank];
            let p = &sharded[&bank];
            assert_eq!(s.total_reviews, p.total_reviews);
            assert_eq!(s.aggregates.len(), p.aggregates.len());
            for (x, y) in s.aggregates.iter().zip(&p.aggregates) {
                assert_eq!(x.theme, y.theme);
                assert_eq!(x.count, y.count);
                assert_eq!(x.example_review_id, y.example_review_id);
                assert!((x.avg_sentiment - y.avg_sentiment).abs() < 1e-9);
                assert!((x.share_pct - y.share_pct).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_empty_accumulator_has_no_average() {
        assert_eq!(ThemeAccumulator::default().average(), None);
    }
}
