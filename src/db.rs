// 🗄️ Insight Store - SQLite persistence for reviews and analysis runs
//
// Reviews are keyed by a content hash and inserted idempotently: importing the
// same CSV twice leaves the table unchanged, while row-numbered ids from
// different exports do not collide. Each analysis run gets its own row and
// its surviving theme aggregates.

use crate::aggregator::ThemeAggregate;
use crate::enricher::EnrichedReview;
use crate::pipeline::InsightReport;
use crate::review::Bank;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of a batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertStats {
    pub inserted: usize,
    pub duplicates: usize,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Analysis runs
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS analysis_runs (
            run_id TEXT PRIMARY KEY,
            generated_at TEXT NOT NULL,
            min_count INTEGER NOT NULL,
            top_k INTEGER NOT NULL,
            total_reviews INTEGER NOT NULL,
            report TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Reviews (enriched)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reviews (
            idempotency_hash TEXT PRIMARY KEY,
            review_id TEXT NOT NULL,
            bank TEXT NOT NULL,
            review_text TEXT NOT NULL,
            normalized_text TEXT NOT NULL,
            rating INTEGER NOT NULL,
            review_date TEXT NOT NULL,
            source TEXT NOT NULL,
            sentiment_label TEXT NOT NULL,
            sentiment_score REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_themes (
            idempotency_hash TEXT NOT NULL,
            theme TEXT NOT NULL,
            keywords TEXT NOT NULL,
            PRIMARY KEY (idempotency_hash, theme)
        )",
        [],
    )?;

    // ==========================================================================
    // Theme aggregates per run
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS theme_aggregates (
            run_id TEXT NOT NULL,
            bank TEXT NOT NULL,
            theme TEXT NOT NULL,
            count INTEGER NOT NULL,
            share_pct REAL NOT NULL,
            avg_sentiment REAL NOT NULL,
            example_quote TEXT NOT NULL,
            example_review_id TEXT NOT NULL,
            PRIMARY KEY (run_id, bank, theme)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute("CREATE INDEX IF NOT EXISTS idx_reviews_review_id ON reviews(review_id)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_reviews_bank ON reviews(bank)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_reviews_date ON reviews(review_date)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_review_themes_theme ON review_themes(theme)", [])?;

    Ok(())
}

/// Insert enriched reviews and their theme matches. Reviews already stored
/// (same content hash) are counted as duplicates and left untouched.
pub fn insert_reviews(conn: &mut Connection, reviews: &[EnrichedReview]) -> Result<InsertStats> {
    let mut stats = InsertStats::default();
    let tx = conn.transaction()?;

    {
        let mut insert_review = tx.prepare(
            "INSERT OR IGNORE INTO reviews (
                idempotency_hash, review_id, bank, review_text, normalized_text,
                rating, review_date, source, sentiment_label, sentiment_score
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        let mut insert_theme = tx.prepare(
            "INSERT OR IGNORE INTO review_themes (idempotency_hash, theme, keywords) VALUES (?1, ?2, ?3)",
        )?;

        for review in reviews {
            let raw = &review.review;
            let hash = raw.idempotency_hash();
            let changed = insert_review.execute(params![
                hash,
                raw.review_id,
                raw.bank.code(),
                raw.review_text,
                review.normalized_text.as_str(),
                raw.rating,
                raw.review_date.to_string(),
                raw.source,
                review.sentiment.label.as_str(),
                review.sentiment.score,
            ])?;

            if changed == 0 {
                stats.duplicates += 1;
                continue;
            }
            stats.inserted += 1;

            for matched in &review.matched_themes {
                let keywords: Vec<&str> = matched.keywords.iter().map(|k| k.as_str()).collect();
                insert_theme.execute(params![hash, matched.theme, keywords.join("|")])?;
            }
        }
    }

    tx.commit()?;
    info!(inserted = stats.inserted, duplicates = stats.duplicates, "reviews stored");
    Ok(stats)
}

/// Persist a run: the full report as JSON plus one row per surviving aggregate
pub fn insert_report(conn: &mut Connection, report: &InsightReport) -> Result<()> {
    let report_json = serde_json::to_string(report).context("Failed to serialize report")?;
    let run_id = report.run_id.to_string();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO analysis_runs (run_id, generated_at, min_count, top_k, total_reviews, report)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            run_id,
            report.generated_at.to_rfc3339(),
            report.min_count as i64,
            report.top_k as i64,
            report.total_reviews() as i64,
            report_json,
        ],
    )
    .with_context(|| format!("Failed to insert analysis run {}", run_id))?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO theme_aggregates (
                run_id, bank, theme, count, share_pct, avg_sentiment,
                example_quote, example_review_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for bank_report in report.banks.values() {
            for agg in &bank_report.aggregates {
                stmt.execute(params![
                    run_id,
                    agg.bank.code(),
                    agg.theme,
                    agg.count as i64,
                    agg.share_pct,
                    agg.avg_sentiment,
                    agg.example_quote,
                    agg.example_review_id,
                ])?;
            }
        }
    }

    tx.commit()?;
    info!(run_id = %run_id, "analysis run stored");
    Ok(())
}

pub fn count_reviews(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
    Ok(count)
}

/// Aggregates stored for a run, per bank in report order, largest first
pub fn get_theme_aggregates(conn: &Connection, run_id: &str) -> Result<Vec<ThemeAggregate>> {
    let mut stmt = conn.prepare(
        "SELECT bank, theme, count, share_pct, avg_sentiment, example_quote, example_review_id
         FROM theme_aggregates
         WHERE run_id = ?1
         ORDER BY count DESC, theme ASC",
    )?;

    let rows = stmt
        .query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut aggregates = Vec::with_capacity(rows.len());
    for (bank, theme, count, share_pct, avg_sentiment, example_quote, example_review_id) in rows {
        aggregates.push(ThemeAggregate {
            bank: Bank::resolve(&bank, 0)?,
            theme,
            count: count as usize,
            share_pct,
            avg_sentiment,
            example_quote,
            example_review_id,
        });
    }
    aggregates.sort_by_key(|a| a.bank);

    Ok(aggregates)
}

/// Number of stored theme matches for a theme across all reviews
pub fn count_theme_matches(conn: &Connection, theme: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM review_themes WHERE theme = ?1",
        params![theme],
        |row| row.get(0),
    )?;
    Ok(count)
}
