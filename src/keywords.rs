// 🔑 Top Terms - TF-IDF keywords per bank
//
// One document per review, unigrams + bigrams over normalized text.
// Terms are ranked by their mean L2-normalized TF-IDF weight across the bank's documents.

use crate::enricher::EnrichmentBatch;
use crate::normalizer::{normalize, NormalizedText};
use crate::review::Bank;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const DEFAULT_TOP_TERMS: usize = 10;
pub const DEFAULT_MIN_DF: usize = 2;

/// Shorter tokens are dropped before building terms
const MIN_TOKEN_CHARS: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "is", "it", "this", "that", "to", "for", "in", "on", "of", "with", "at", "as",
    "was", "are", "but", "you", "your", "have", "has", "very", "can", "its", "app", "bank",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTerm {
    pub term: String,
    /// Mean TF-IDF weight over the bank's documents
    pub score: f64,
    /// Documents containing the term
    pub doc_freq: usize,
}

/// Content tokens of one document, in order
fn content_tokens(text: &NormalizedText) -> Vec<&str> {
    text.tokens()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS && !STOPWORDS.contains(t))
        .collect()
}

/// Unigrams then bigrams of adjacent content tokens
pub fn document_terms(text: &NormalizedText) -> Vec<String> {
    let tokens = content_tokens(text);
    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

pub struct TermExtractor {
    top_n: usize,
    min_df: usize,
}

impl TermExtractor {
    pub fn new(top_n: usize, min_df: usize) -> Self {
        TermExtractor {
            top_n,
            min_df: min_df.max(1),
        }
    }

    /// Highest-weighted terms, score desc then term asc
    pub fn extract(&self, docs: &[NormalizedText]) -> Vec<TopTerm> {
        if self.top_n == 0 || docs.is_empty() {
            return Vec::new();
        }

        let tokenized: Vec<Vec<String>> = docs.iter().map(document_terms).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &tokenized {
            let unique: BTreeSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Small groups fall back to min_df 1 so they still get a vocabulary
        let min_df = if docs.len() >= self.min_df { self.min_df } else { 1 };
        let n = docs.len() as f64;
        let idf: BTreeMap<&str, f64> = doc_freq
            .iter()
            .filter(|(_, df)| **df >= min_df)
            .map(|(term, df)| (*term, ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0))
            .collect();

        if idf.is_empty() {
            debug!(docs = docs.len(), min_df, "no terms reached min_df");
            return Vec::new();
        }

        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for terms in &tokenized {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for term in terms {
                if idf.contains_key(term.as_str()) {
                    *counts.entry(term.as_str()).or_insert(0) += 1;
                }
            }

            let weights: Vec<(&str, f64)> = counts
                .into_iter()
                .map(|(term, count)| (term, count as f64 * idf[term]))
                .collect();
            let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            for (term, weight) in weights {
                *totals.entry(term).or_insert(0.0) += weight / norm;
            }
        }

        let mut ranked: Vec<TopTerm> = totals
            .into_iter()
            .map(|(term, total)| TopTerm {
                term: term.to_string(),
                score: total / n,
                doc_freq: doc_freq[term],
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
        ranked.truncate(self.top_n);
        ranked
    }

    /// Top terms for every known bank, annotated or not
    pub fn extract_by_bank(&self, batch: &EnrichmentBatch) -> BTreeMap<Bank, Vec<TopTerm>> {
        let mut docs: BTreeMap<Bank, Vec<NormalizedText>> =
            Bank::ALL.into_iter().map(|b| (b, Vec::new())).collect();

        for review in &batch.enriched {
            docs.entry(review.bank()).or_default().push(review.normalized_text.clone());
        }
        for review in &batch.unannotated {
            docs.entry(review.bank).or_default().push(normalize(&review.review_text));
        }

        docs.into_iter()
            .map(|(bank, texts)| {
                let terms = self.extract(&texts);
                debug!(bank = %bank, docs = texts.len(), terms = terms.len(), "terms extracted");
                (bank, terms)
            })
            .collect()
    }
}

impl Default for TermExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_TERMS, DEFAULT_MIN_DF)
    }
}
