// ⚙️ Analysis Configuration
// YAML or JSON file → defaults → CLI overrides

use crate::aggregator::DEFAULT_MIN_COUNT;
use crate::enricher::MissingAnnotationPolicy;
use crate::error::InsightError;
use crate::keywords::{DEFAULT_MIN_DF, DEFAULT_TOP_TERMS};
use crate::ranker::DEFAULT_TOP_K;
use crate::sentiment::ScoreScale;
use crate::themes::ThemeCatalog;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Minimum matching reviews for a (bank, theme) aggregate to be reported
    pub min_count: usize,

    /// Drivers / pain points kept per bank
    pub top_k: usize,

    pub missing_annotation: MissingAnnotationPolicy,

    /// Convention of the `score` column in sentiment input
    pub score_scale: ScoreScale,

    /// Theme catalog file; built-in catalog when absent
    pub themes: Option<PathBuf>,

    /// TF-IDF terms kept per bank; 0 disables extraction
    pub top_terms: usize,

    /// Minimum documents a term must appear in
    pub min_df: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            min_count: DEFAULT_MIN_COUNT,
            top_k: DEFAULT_TOP_K,
            missing_annotation: MissingAnnotationPolicy::default(),
            score_scale: ScoreScale::default(),
            themes: None,
            top_terms: DEFAULT_TOP_TERMS,
            min_df: DEFAULT_MIN_DF,
        }
    }
}

impl AnalysisConfig {
    /// Load from YAML (.yaml/.yml) or JSON, filling gaps with defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let mut config: AnalysisConfig = if is_yaml {
            serde_yaml::from_str(&content).context("Failed to parse config YAML")?
        } else {
            serde_json::from_str(&content).context("Failed to parse config JSON")?
        };

        // Catalog paths are relative to the config file
        if let (Some(themes), Some(dir)) = (config.themes.as_ref(), path.parent()) {
            if themes.is_relative() {
                config.themes = Some(dir.join(themes));
            }
        }

        config.validate()?;
        info!(path = ?path, min_count = config.min_count, top_k = config.top_k, "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InsightError> {
        if self.min_count == 0 {
            return Err(InsightError::InvalidConfig("min_count must be at least 1".to_string()));
        }
        if self.top_k == 0 {
            return Err(InsightError::InvalidConfig("top_k must be at least 1".to_string()));
        }
        if self.min_df == 0 {
            return Err(InsightError::InvalidConfig("min_df must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Configured catalog, or the built-in one
    pub fn load_catalog(&self) -> Result<ThemeCatalog> {
        match &self.themes {
            Some(path) => ThemeCatalog::from_file(path),
            None => Ok(ThemeCatalog::default_catalog()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.min_count, 3);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.missing_annotation, MissingAnnotationPolicy::Skip);
        assert_eq!(config.score_scale, ScoreScale::Signed);
        assert_eq!(config.top_terms, 10);
        assert_eq!(config.min_df, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "min_count: 5\nmissing_annotation: abort\nthemes: themes.yaml").unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.min_count, 5);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.missing_annotation, MissingAnnotationPolicy::Abort);
        assert_eq!(config.themes, Some(dir.path().join("themes.yaml")));
    }

    #[test]
    fn test_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        fs::write(&path, r#"{"top_k": 5, "score_scale": "probability"}"#).unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.score_scale, ScoreScale::Probability);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "min_count: 0\n").unwrap();
        assert!(AnalysisConfig::from_file(&path).is_err());

        fs::write(&path, "min_df: 0\n").unwrap();
        assert!(AnalysisConfig::from_file(&path).is_err());

        fs::write(&path, "minimum: 3\n").unwrap();
        assert!(AnalysisConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_default_catalog_when_unset() {
        let catalog = AnalysisConfig::default().load_catalog().unwrap();
        assert_eq!(catalog.len(), 5);
    }
}
