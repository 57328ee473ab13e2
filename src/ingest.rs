// 📥 Ingest - CSV → RawReview / SentimentTable
//
// Header names vary between scraper exports ("review" vs "review_text",
// "score" vs "rating", ...). Each logical field resolves through an alias
// list; a field that cannot be resolved, or a null cell, fails fast.
// Review text is the exception: an empty text is kept as unclassifiable.

use crate::error::{InsightError, InsightResult};
use crate::review::{Bank, RawReview};
use crate::sentiment::{ScoreScale, SentimentAnnotation, SentimentLabel, SentimentTable};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// COLUMN ALIASES
// ============================================================================

const REVIEW_ID: &[&str] = &["review_id", "id", "reviewid"];
const TEXT: &[&str] = &["review_text", "review", "content", "text"];
const RATING: &[&str] = &["rating", "score", "stars"];
const DATE: &[&str] = &["review_date", "date", "at"];
const BANK: &[&str] = &["bank_name", "bank", "app"];
const SOURCE: &[&str] = &["source", "platform"];

const SENTIMENT_LABEL: &[&str] = &["label", "sentiment_label"];
const SENTIMENT_SCORE: &[&str] = &["score", "sentiment_score"];

fn find_column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias))
    })
}

fn require_column(headers: &StringRecord, field: &str, aliases: &[&str]) -> InsightResult<usize> {
    find_column(headers, aliases).ok_or_else(|| InsightError::MissingColumn {
        field: field.to_string(),
        accepted: aliases.join(", "),
    })
}

/// Cell value, failing on absent or empty
fn required<'r>(
    record: &'r StringRecord,
    idx: usize,
    field: &str,
    row: usize,
) -> InsightResult<&'r str> {
    match record.get(idx) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(InsightError::MissingField {
            field: field.to_string(),
            row,
        }),
    }
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

/// Accepts "4" and integral decimals like "4.0"; must be 1-5
pub fn parse_rating(raw: &str, row: usize) -> InsightResult<u8> {
    let invalid = || InsightError::InvalidField {
        field: "rating".to_string(),
        value: raw.to_string(),
        row,
    };

    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return Err(invalid());
    }
    Ok(value as u8)
}

/// Accepts YYYY-MM-DD, YYYY-MM-DD HH:MM:SS, RFC 3339 and MM/DD/YYYY
pub fn parse_review_date(raw: &str, row: usize) -> InsightResult<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return Ok(date);
    }

    Err(InsightError::InvalidField {
        field: "date".to_string(),
        value: raw.to_string(),
        row,
    })
}

/// Id for inputs without a review_id column: the 1-based data row number.
/// Sentiment files produced for the same export key on the same sequence.
pub fn row_review_id(row: usize) -> String {
    row.to_string()
}

// ============================================================================
// REVIEWS
// ============================================================================

/// Read reviews from any CSV source. Duplicate review_ids keep the first row.
pub fn read_reviews<R: io::Read>(reader: R) -> Result<Vec<RawReview>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let id_col = find_column(&headers, REVIEW_ID);
    let text_col = require_column(&headers, "review_text", TEXT)?;
    let rating_col = require_column(&headers, "rating", RATING)?;
    let date_col = require_column(&headers, "review_date", DATE)?;
    let bank_col = require_column(&headers, "bank_name", BANK)?;
    let source_col = require_column(&headers, "source", SOURCE)?;

    if id_col.is_none() {
        info!("no review_id column, using row numbers as ids");
    }

    let mut seen = HashSet::new();
    let mut reviews = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result.with_context(|| format!("Failed to read CSV row {}", row))?;

        let bank = Bank::resolve(required(&record, bank_col, "bank_name", row)?, row)?;
        let text = record.get(text_col).unwrap_or("");
        let rating = parse_rating(required(&record, rating_col, "rating", row)?, row)?;
        let date = parse_review_date(required(&record, date_col, "review_date", row)?, row)?;
        let source = required(&record, source_col, "source", row)?;

        let review_id = match id_col {
            Some(col) => required(&record, col, "review_id", row)?.trim().to_string(),
            None => row_review_id(row),
        };

        if !seen.insert(review_id.clone()) {
            warn!(review_id = %review_id, row, "duplicate review_id, keeping first occurrence");
            continue;
        }

        reviews.push(RawReview::new(review_id, bank, text, rating, date, source));
    }

    info!(reviews = reviews.len(), "reviews loaded");
    Ok(reviews)
}

pub fn load_reviews(path: &Path) -> Result<Vec<RawReview>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open reviews CSV: {:?}", path))?;
    read_reviews(file)
}

// ============================================================================
// SENTIMENT
// ============================================================================

/// Read review_id → annotation. A blank label is derived from a signed score.
pub fn read_sentiment<R: io::Read>(reader: R, scale: ScoreScale) -> Result<SentimentTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let id_col = require_column(&headers, "review_id", REVIEW_ID)?;
    let label_col = find_column(&headers, SENTIMENT_LABEL);
    let score_col = require_column(&headers, "score", SENTIMENT_SCORE)?;

    let mut table = SentimentTable::new();

    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result.with_context(|| format!("Failed to read CSV row {}", row))?;

        let review_id = required(&record, id_col, "review_id", row)?.trim().to_string();
        let raw_score = required(&record, score_col, "score", row)?;
        let score: f64 = raw_score.trim().parse().map_err(|_| InsightError::InvalidField {
            field: "score".to_string(),
            value: raw_score.to_string(),
            row,
        })?;

        let raw_label = label_col.and_then(|col| record.get(col)).unwrap_or("").trim();
        let label = if raw_label.is_empty() {
            match scale {
                ScoreScale::Signed => SentimentLabel::from_signed(score),
                ScoreScale::Probability => {
                    return Err(InsightError::MissingField {
                        field: "label".to_string(),
                        row,
                    }
                    .into())
                }
            }
        } else {
            SentimentLabel::parse(raw_label).ok_or_else(|| InsightError::InvalidField {
                field: "label".to_string(),
                value: raw_label.to_string(),
                row,
            })?
        };

        let annotation = SentimentAnnotation::with_scale(label, score, scale).map_err(|e| match e {
            InsightError::InvalidField { field, value, .. } => {
                InsightError::InvalidField { field, value, row }
            }
            other => other,
        })?;

        if table.get(&review_id).is_some() {
            warn!(review_id = %review_id, row, "duplicate sentiment annotation, keeping first");
            continue;
        }
        table.insert(review_id, annotation);
    }

    info!(annotations = table.len(), "sentiment annotations loaded");
    Ok(table)
}

pub fn load_sentiment(path: &Path, scale: ScoreScale) -> Result<SentimentTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open sentiment CSV: {:?}", path))?;
    read_sentiment(file, scale)
}

// ============================================================================
// TESTS
// ============================================================================
