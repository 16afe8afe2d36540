//! Configuration for the ranking pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RankflowError, Result};
use crate::facet::FacetConfig;

/// Default ceiling on candidates requested from the inverted index.
pub const DEFAULT_MAX_CANDIDATES: usize = 3_000_000;

/// Default number of ranked documents the attribute facet pass looks at.
pub const DEFAULT_ATTRIBUTE_TOP_DOCS: usize = 60;

/// Configuration for a [`RankingEngine`](crate::engine::RankingEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum number of candidates requested from the inverted index.
    pub max_candidates: usize,

    /// Number of top ranked documents evaluated by the attribute facet pass.
    pub attribute_top_docs: usize,

    /// How the base relevance score and the categorical score are combined.
    pub fusion: FusionPolicy,

    /// Which documents the attribute facet pass counts.
    pub attribute_scope: AttributeFacetScope,

    /// Facet representation settings.
    pub facet: FacetConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            attribute_top_docs: DEFAULT_ATTRIBUTE_TOP_DOCS,
            fusion: FusionPolicy::default(),
            attribute_scope: AttributeFacetScope::default(),
            facet: FacetConfig::default(),
        }
    }
}

impl RetrievalConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RetrievalConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            return Err(RankflowError::config("max_candidates must be positive"));
        }

        if let FusionPolicy::Weighted {
            relevance_weight,
            categorical_weight,
        } = self.fusion
        {
            for (name, weight) in [
                ("relevance_weight", relevance_weight),
                ("categorical_weight", categorical_weight),
            ] {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(RankflowError::config(format!(
                        "{name} must be a finite non-negative number, got {weight}"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Score fusion policy for combining relevance and categorical scores.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Plain sum of both scores.
    #[default]
    Additive,
    /// Weighted sum of both scores.
    Weighted {
        relevance_weight: f32,
        categorical_weight: f32,
    },
}

/// Scope of the attribute facet pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeFacetScope {
    /// Count only the first `attribute_top_docs` documents of the ranked page.
    #[default]
    RankedPrefix,
    /// Count every document that survives the filter chain.
    AllSurvivors,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_retrieval_config_default() {
        let config = RetrievalConfig::default();
        assert_eq!(config.max_candidates, 3_000_000);
        assert_eq!(config.attribute_top_docs, 60);
        assert_eq!(config.fusion, FusionPolicy::Additive);
        assert_eq!(config.attribute_scope, AttributeFacetScope::RankedPrefix);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = RetrievalConfig::from_json_str(
            r#"{"attribute_top_docs": 10, "fusion": {"type": "weighted", "relevance_weight": 1.0, "categorical_weight": 0.5}}"#,
        )
        .unwrap();

        assert_eq!(config.attribute_top_docs, 10);
        assert_eq!(config.max_candidates, DEFAULT_MAX_CANDIDATES);
        assert_eq!(
            config.fusion,
            FusionPolicy::Weighted {
                relevance_weight: 1.0,
                categorical_weight: 0.5
            }
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(RetrievalConfig::from_json_str(r#"{"max_candidates": 0}"#).is_err());
        assert!(
            RetrievalConfig::from_json_str(
                r#"{"fusion": {"type": "weighted", "relevance_weight": -1.0, "categorical_weight": 0.5}}"#
            )
            .is_err()
        );
        assert!(RetrievalConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"attribute_scope": "all_survivors"}}"#).unwrap();

        let config = RetrievalConfig::from_file(file.path()).unwrap();
        assert_eq!(config.attribute_scope, AttributeFacetScope::AllSurvivors);

        let missing = RetrievalConfig::from_file("/nonexistent/rankflow.json");
        assert!(matches!(missing, Err(RankflowError::Io(_))));
    }
}
