// 💬 Sentiment Annotations - Precomputed, consumed as-is
//
// Scores arrive either signed ([-1, 1], lexicon compound style) or as a class
// probability ([0, 1], transformer style). Everything downstream sees signed.

use crate::error::{InsightError, InsightResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Compound scores inside ±NEUTRAL_BAND are labelled neutral
pub const NEUTRAL_BAND: f64 = 0.05;

// ============================================================================
// LABEL + SCALE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
            SentimentLabel::Neutral => "NEUTRAL",
        }
    }

    /// Parse common spellings ("positive", "POS", "Neg", ...)
    pub fn parse(raw: &str) -> Option<SentimentLabel> {
        match raw.trim().to_lowercase().as_str() {
            "positive" | "pos" => Some(SentimentLabel::Positive),
            "negative" | "neg" => Some(SentimentLabel::Negative),
            "neutral" | "neu" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }

    /// Label implied by a signed score
    pub fn from_signed(score: f64) -> SentimentLabel {
        if score >= NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if score <= -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convention the upstream scorer used for `score`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// Already in [-1, 1]
    #[default]
    Signed,
    /// Confidence of `label` in [0, 1]; sign comes from the label
    Probability,
}

// ============================================================================
// ANNOTATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnnotation {
    pub label: SentimentLabel,
    /// Always signed: negative values mean negative sentiment
    pub score: f64,
}

impl SentimentAnnotation {
    /// Build from a signed score, checking range and that the label's sign agrees
    pub fn signed(label: SentimentLabel, score: f64) -> InsightResult<Self> {
        if !score.is_finite() || !(-1.0..=1.0).contains(&score) {
            return Err(InsightError::InvalidField {
                field: "score".to_string(),
                value: score.to_string(),
                row: 0,
            });
        }
        let contradicts = match label {
            SentimentLabel::Positive => score <= -NEUTRAL_BAND,
            SentimentLabel::Negative => score >= NEUTRAL_BAND,
            SentimentLabel::Neutral => false,
        };
        if contradicts {
            return Err(InsightError::InvalidField {
                field: "label".to_string(),
                value: format!("{} with score {}", label, score),
                row: 0,
            });
        }
        Ok(SentimentAnnotation { label, score })
    }

    /// Build from a label probability. Positive keeps the sign, negative flips
    /// it, neutral collapses to zero.
    pub fn from_probability(label: SentimentLabel, probability: f64) -> InsightResult<Self> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(InsightError::InvalidField {
                field: "score".to_string(),
                value: probability.to_string(),
                row: 0,
            });
        }
        let score = match label {
            SentimentLabel::Positive => probability,
            SentimentLabel::Negative => -probability,
            SentimentLabel::Neutral => 0.0,
        };
        Ok(SentimentAnnotation { label, score })
    }

    /// Build under the given convention
    pub fn with_scale(label: SentimentLabel, score: f64, scale: ScoreScale) -> InsightResult<Self> {
        match scale {
            ScoreScale::Signed => Self::signed(label, score),
            ScoreScale::Probability => Self::from_probability(label, score),
        }
    }
}

// ============================================================================
// ANNOTATION TABLE (review_id → annotation)
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SentimentTable {
    annotations: HashMap<String, SentimentAnnotation>,
}

impl SentimentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, returning the previous annotation for the id if there was one
    pub fn insert(
        &mut self,
        review_id: impl Into<String>,
        annotation: SentimentAnnotation,
    ) -> Option<SentimentAnnotation> {
        self.annotations.insert(review_id.into(), annotation)
    }

    pub fn get(&self, review_id: &str) -> Option<&SentimentAnnotation> {
        self.annotations.get(review_id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl FromIterator<(String, SentimentAnnotation)> for SentimentTable {
    fn from_iter<I: IntoIterator<Item = (String, SentimentAnnotation)>>(iter: I) -> Self {
        SentimentTable {
            annotations: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
