// 📈 Bank Summary - Executive-summary numbers per bank
// Sample sizes, label mix, rating distribution, sentiment by month and by star rating

use crate::enricher::EnrichmentBatch;
use crate::review::Bank;
use crate::sentiment::SentimentLabel;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl LabelCounts {
    fn record(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }
}

/// Annotated reviews in one month or star rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentBucket {
    pub count: usize,
    pub avg_sentiment: f64,
}

impl SentimentBucket {
    fn from_sum(count: usize, sum: f64) -> Self {
        SentimentBucket {
            count,
            avg_sentiment: sum / count as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSummary {
    pub bank: Bank,
    pub total_reviews: usize,
    pub annotated: usize,
    pub unannotated: usize,
    pub unclassifiable: usize,
    pub themed: usize,
    /// None when the bank has no annotated reviews
    pub mean_sentiment: Option<f64>,
    pub labels: LabelCounts,
    /// Index 0 holds 1-star reviews, index 4 holds 5-star reviews
    pub rating_distribution: [usize; 5],
    /// Keyed by "YYYY-MM"
    pub monthly_sentiment: BTreeMap<String, SentimentBucket>,
    /// Keyed by star rating; only ratings that occur among annotated reviews
    pub sentiment_by_rating: BTreeMap<u8, SentimentBucket>,
}

impl BankSummary {
    pub fn empty(bank: Bank) -> Self {
        BankSummary {
            bank,
            total_reviews: 0,
            annotated: 0,
            unannotated: 0,
            unclassifiable: 0,
            themed: 0,
            mean_sentiment: None,
            labels: LabelCounts::default(),
            rating_distribution: [0; 5],
            monthly_sentiment: BTreeMap::new(),
            sentiment_by_rating: BTreeMap::new(),
        }
    }

    /// Mean star rating over all reviews (annotated or not)
    pub fn mean_rating(&self) -> Option<f64> {
        let n: usize = self.rating_distribution.iter().sum();
        if n == 0 {
            return None;
        }
        let stars: usize = self
            .rating_distribution
            .iter()
            .enumerate()
            .map(|(i, c)| (i + 1) * c)
            .sum();
        Some(stars as f64 / n as f64)
    }
}

fn record_rating(dist: &mut [usize; 5], rating: u8) {
    if (1..=5).contains(&rating) {
        dist[(rating - 1) as usize] += 1;
    }
}

/// Summaries for every known bank
pub fn summarize(batch: &EnrichmentBatch) -> BTreeMap<Bank, BankSummary> {
    let mut out: BTreeMap<Bank, BankSummary> =
        Bank::ALL.into_iter().map(|b| (b, BankSummary::empty(b))).collect();
    let mut sums: BTreeMap<Bank, f64> = BTreeMap::new();
    let mut monthly: BTreeMap<(Bank, String), (usize, f64)> = BTreeMap::new();
    let mut by_rating: BTreeMap<(Bank, u8), (usize, f64)> = BTreeMap::new();

    for review in &batch.enriched {
        let bank = review.bank();
        let summary = out.entry(bank).or_insert_with(|| BankSummary::empty(bank));
        summary.total_reviews += 1;
        summary.annotated += 1;
        if review.is_unclassifiable() {
            summary.unclassifiable += 1;
        }
        if !review.matched_themes.is_empty() {
            summary.themed += 1;
        }
        summary.labels.record(review.sentiment.label);
        record_rating(&mut summary.rating_distribution, review.review.rating);
        *sums.entry(bank).or_insert(0.0) += review.score();

        let date = review.review.review_date;
        let month = format!("{:04}-{:02}", date.year(), date.month());
        let slot = monthly.entry((bank, month)).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += review.score();

        let slot = by_rating.entry((bank, review.review.rating)).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += review.score();
    }

    for review in &batch.unannotated {
        let summary = out
            .entry(review.bank)
            .or_insert_with(|| BankSummary::empty(review.bank));
        summary.total_reviews += 1;
        summary.unannotated += 1;
        record_rating(&mut summary.rating_distribution, review.rating);
    }

    for (bank, sum) in sums {
        if let Some(summary) = out.get_mut(&bank) {
            if summary.annotated > 0 {
                summary.mean_sentiment = Some(sum / summary.annotated as f64);
            }
        }
    }

    for ((bank, month), (count, sum)) in monthly {
        if let Some(summary) = out.get_mut(&bank) {
            summary
                .monthly_sentiment
                .insert(month, SentimentBucket::from_sum(count, sum));
        }
    }

    for ((bank, rating), (count, sum)) in by_rating {
        if let Some(summary) = out.get_mut(&bank) {
            summary
                .sentiment_by_rating
                .insert(rating, SentimentBucket::from_sum(count, sum));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enricher::EnrichedReview;
    use crate::normalizer::normalize;
    use crate::review::RawReview;
    use crate::sentiment::SentimentAnnotation;
    use crate::themes::{ThemeCatalog, ThemeClassifier};
    use chrono::NaiveDate;

    fn enriched(
        id: &str,
        text: &str,
        rating: u8,
        date: (i32, u32, u32),
        score: f64,
    ) -> EnrichedReview {
        let normalized = normalize(text);
        let themes = ThemeCatalog::default_catalog().classify(&normalized);
        EnrichedReview::new(
            RawReview::new(
                id,
                Bank::Boa,
                text,
                rating,
                NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
                "Google Play",
            ),
            SentimentAnnotation::signed(SentimentLabel::from_signed(score), score).unwrap(),
            normalized,
            themes,
        )
    }

    #[test]
    fn test_summary_counts() {
        let batch = EnrichmentBatch {
            enriched: vec![
                enriched("1", "slow transfer", 1, (2025, 1, 3), -0.6),
                enriched("2", "👍", 5, (2025, 1, 20), 0.8),
                enriched("3", "ok app", 3, (2025, 2, 1), 0.0),
            ],
            unannotated: vec![RawReview::new(
                "4",
                Bank::Boa,
                "login",
                2,
                NaiveDate::from_ymd_opt(2025, 2, 2).unwrap(),
                "Google Play",
            )],
        };

        let summaries = summarize(&batch);
        let boa = &summaries[&Bank::Boa];

        assert_eq!(boa.total_reviews, 4);
        assert_eq!(boa.annotated, 3);
        assert_eq!(boa.unannotated, 1);
        assert_eq!(boa.unclassifiable, 1);
        assert_eq!(boa.themed, 1);
        assert_eq!(boa.labels.negative, 1);
        assert_eq!(boa.labels.positive, 1);
        assert_eq!(boa.labels.neutral, 1);
        assert_eq!(boa.rating_distribution, [1, 1, 1, 0, 1]);
        assert!((boa.mean_sentiment.unwrap() - (0.2 / 3.0)).abs() < 1e-9);
        assert!((boa.mean_rating().unwrap() - 2.75).abs() < 1e-9);

        let jan = boa.monthly_sentiment["2025-01"];
        assert_eq!(jan.count, 2);
        assert!((jan.avg_sentiment - 0.1).abs() < 1e-9);
        assert_eq!(boa.monthly_sentiment["2025-02"].count, 1);
    }

    #[test]
    fn test_sentiment_by_rating() {
        let batch = EnrichmentBatch {
            enriched: vec![
                enriched("1", "slow transfer", 1, (2025, 1, 3), -0.6),
                enriched("2", "crash", 1, (2025, 1, 4), -0.2),
                enriched("3", "great", 5, (2025, 1, 5), 0.9),
            ],
            unannotated: vec![RawReview::new(
                "4",
                Bank::Boa,
                "meh",
                3,
                NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                "Google Play",
            )],
        };

        let summaries = summarize(&batch);
        let boa = &summaries[&Bank::Boa];

        assert_eq!(boa.sentiment_by_rating.keys().copied().collect::<Vec<_>>(), vec![1, 5]);
        let one_star = boa.sentiment_by_rating[&1];
        assert_eq!(one_star.count, 2);
        assert!((one_star.avg_sentiment + 0.4).abs() < 1e-9);
        assert!((boa.sentiment_by_rating[&5].avg_sentiment - 0.9).abs() < 1e-9);
        assert!(summaries[&Bank::Cbe].sentiment_by_rating.is_empty());
    }

    #[test]
    fn test_empty_banks_summarized() {
        let summaries = summarize(&EnrichmentBatch::default());
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[&Bank::Cbe].mean_sentiment, None);
        assert_eq!(summaries[&Bank::Cbe].mean_rating(), None);
    }
}
