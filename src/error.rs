// ⚠️ Domain Errors
// Data-quality failures the core surfaces to its caller

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightError {
    /// A review has no sentiment annotation keyed by its review_id
    #[error("No sentiment annotation for review '{review_id}'")]
    MissingAnnotation { review_id: String },

    /// Upstream ingestion produced a bank outside the known catalog
    #[error("Unknown bank '{bank}' (row {row})")]
    UnknownBank { bank: String, row: usize },

    /// A required field is absent or empty
    #[error("Missing required field '{field}' (row {row})")]
    MissingField { field: String, row: usize },

    /// A required field is present but cannot be interpreted
    #[error("Invalid value '{value}' for field '{field}' (row {row})")]
    InvalidField {
        field: String,
        value: String,
        row: usize,
    },

    /// A required column could not be resolved from the input header
    #[error("Missing required column '{field}' (accepted names: {accepted})")]
    MissingColumn { field: String, accepted: String },

    /// Theme catalog is unusable
    #[error("Invalid theme catalog: {0}")]
    InvalidCatalog(String),

    /// Analysis parameters out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type InsightResult<T> = std::result::Result<T, InsightError>;
