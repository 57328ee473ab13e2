// Review Insights - Core Library
// Theme classification, per-bank aggregation and ranking for mobile-banking reviews

pub mod error;
pub mod normalizer;
pub mod review;
pub mod sentiment;
pub mod themes;
pub mod enricher;
pub mod aggregator;
pub mod ranker;
pub mod summary;
pub mod keywords;
pub mod config;
pub mod ingest;
pub mod pipeline;
pub mod db;

// Re-export commonly used types
pub use error::{InsightError, InsightResult};
pub use normalizer::{normalize, NormalizedText};
pub use review::{Bank, RawReview};
pub use sentiment::{ScoreScale, SentimentAnnotation, SentimentLabel, SentimentTable};
pub use themes::{ThemeCatalog, ThemeClassifier, ThemeMatch, ThemeRule};
pub use enricher::{EnrichedReview, Enricher, EnrichmentBatch, MissingAnnotationPolicy};
pub use aggregator::{
    shorten_quote, BankAggregates, BankAggregator, PartialAggregates, ThemeAccumulator,
    ThemeAggregate, DEFAULT_MIN_COUNT, QUOTE_WIDTH,
};
pub use ranker::{recommend, BankInsight, InsightRanker, DEFAULT_TOP_K};
pub use summary::{summarize, BankSummary, LabelCounts, SentimentBucket};
pub use keywords::{TermExtractor, TopTerm, DEFAULT_MIN_DF, DEFAULT_TOP_TERMS};
pub use config::AnalysisConfig;
pub use ingest::{load_reviews, load_sentiment, read_reviews, read_sentiment};
pub use pipeline::{BankReport, InsightPipeline, InsightReport, PipelineOutput};
pub use db::{
    count_reviews, count_theme_matches, get_theme_aggregates, insert_report, insert_reviews,
    setup_database, InsertStats,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
