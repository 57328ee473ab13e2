// 🏦 Review Model - Banks + raw reviews as ingested
//
// "CBE", "Commercial Bank of Ethiopia", "cbe birr" → all the same bank.
// Anything that does not resolve is an upstream ingestion defect.

use crate::error::{InsightError, InsightResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ============================================================================
// BANK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bank {
    #[serde(rename = "CBE")]
    Cbe,
    #[serde(rename = "BOA")]
    Boa,
    #[serde(rename = "Dashen")]
    Dashen,
}

impl Bank {
    /// Every known bank, in report order
    pub const ALL: [Bank; 3] = [Bank::Cbe, Bank::Boa, Bank::Dashen];

    /// Short code used in data files and reports
    pub fn code(&self) -> &'static str {
        match self {
            Bank::Cbe => "CBE",
            Bank::Boa => "BOA",
            Bank::Dashen => "Dashen",
        }
    }

    /// Human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Bank::Cbe => "Commercial Bank of Ethiopia",
            Bank::Boa => "Bank of Abyssinia",
            Bank::Dashen => "Dashen Bank",
        }
    }

    /// Alternative names seen in scraped data (app titles, abbreviations)
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Bank::Cbe => &["commercial bank of ethiopia", "cbe birr", "cbe mobile"],
            Bank::Boa => &["bank of abyssinia", "boa mobile", "abyssinia"],
            Bank::Dashen => &["dashen bank", "amole", "dashen superapp", "dashen super app"],
        }
    }

    /// Check if a string names this bank (code or any alias, case-insensitive).
    /// Scraper labels like "Commercial Bank of Ethiopia (CBE)" match on either
    /// the name or the parenthesised code.
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }
        if self.matches_exact(&lower) {
            return true;
        }
        match split_code_suffix(&lower) {
            Some((label, code)) => self.matches_exact(label) || code == self.code().to_lowercase(),
            None => false,
        }
    }

    fn matches_exact(&self, lower: &str) -> bool {
        lower == self.code().to_lowercase() || self.aliases().iter().any(|alias| lower == *alias)
    }

    /// Resolve a raw bank string, failing on anything outside the catalog
    pub fn resolve(name: &str, row: usize) -> InsightResult<Bank> {
        Bank::ALL
            .into_iter()
            .find(|bank| bank.matches(name))
            .ok_or_else(|| InsightError::UnknownBank {
                bank: name.to_string(),
                row,
            })
    }
}

/// "name (code)" → ("name", "code")
fn split_code_suffix(lower: &str) -> Option<(&str, &str)> {
    let inner = lower.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    Some((inner[..open].trim(), inner[open + 1..].trim()))
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// RAW REVIEW
// ============================================================================

/// One review as delivered by the upstream cleaning stage. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub review_id: String,
    pub bank: Bank,
    pub review_text: String,
    pub rating: u8,
    pub review_date: NaiveDate,
    pub source: String,
}

impl RawReview {
    pub fn new(
        review_id: impl Into<String>,
        bank: Bank,
        review_text: impl Into<String>,
        rating: u8,
        review_date: NaiveDate,
        source: impl Into<String>,
    ) -> Self {
        RawReview {
            review_id: review_id.into(),
            bank,
            review_text: review_text.into(),
            rating,
            review_date,
            source: source.into(),
        }
    }

    /// Content hash for idempotent storage. Row-numbered ids repeat across
    /// exports, so the id alone cannot key persisted reviews.
    pub fn idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            self.bank.code(),
            self.review_id,
            self.review_text,
            self.review_date,
            self.rating
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================
