//! Matcher configuration
//!
//! Every acceptance threshold and fixed confidence the pipeline uses lives
//! here as a named value, loadable from a YAML file.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Thresholds and constants for the matching pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatcherConfig {
    /// Minimum similarity score to accept a similarity match
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Minimum rule score to accept a rule-based match
    #[serde(default = "default_rule_min_score")]
    pub rule_min_score: f64,

    /// Divisor mapping a rule score onto [0, 1]
    #[serde(default = "default_rule_confidence_scale")]
    pub rule_confidence_scale: f64,

    /// Confidence reported for first/last-name attribute hints
    #[serde(default = "default_grouped_name_confidence")]
    pub grouped_name_confidence: f64,

    /// Confidence reported for date-group role assignments
    #[serde(default = "default_date_component_confidence")]
    pub date_component_confidence: f64,

    /// Confidence reported for input-type fallbacks
    #[serde(default = "default_type_hint_confidence")]
    pub type_hint_confidence: f64,

    /// Minimum option score for a dropdown selection
    #[serde(default = "default_dropdown_min_score")]
    pub dropdown_min_score: u8,

    /// Minimum confidence to accept a remote classification
    #[serde(default = "default_remote_min_confidence")]
    pub remote_min_confidence: f64,

    /// Time budget for one remote classification call
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,

    /// Base URL of the remote classification service
    #[serde(default)]
    pub remote_endpoint: Option<String>,

    /// API key sent to the remote classification service
    #[serde(default)]
    pub remote_api_key: Option<String>,
}

fn default_similarity_threshold() -> f64 {
    0.5
}

fn default_rule_min_score() -> f64 {
    3.0
}

fn default_rule_confidence_scale() -> f64 {
    10.0
}

fn default_grouped_name_confidence() -> f64 {
    0.9
}

fn default_date_component_confidence() -> f64 {
    0.85
}

fn default_type_hint_confidence() -> f64 {
    0.25
}

fn default_dropdown_min_score() -> u8 {
    3
}

fn default_remote_min_confidence() -> f64 {
    0.8
}

fn default_remote_timeout_ms() -> u64 {
    1500
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            rule_min_score: default_rule_min_score(),
            rule_confidence_scale: default_rule_confidence_scale(),
            grouped_name_confidence: default_grouped_name_confidence(),
            date_component_confidence: default_date_component_confidence(),
            type_hint_confidence: default_type_hint_confidence(),
            dropdown_min_score: default_dropdown_min_score(),
            remote_min_confidence: default_remote_min_confidence(),
            remote_timeout_ms: default_remote_timeout_ms(),
            remote_endpoint: None,
            remote_api_key: None,
        }
    }
}

impl MatcherConfig {
    /// Parse and validate a YAML config
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: MatcherConfig = serde_norway::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_yaml(&content)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let unit_values = [
            ("similarity_threshold", self.similarity_threshold),
            ("grouped_name_confidence", self.grouped_name_confidence),
            ("date_component_confidence", self.date_component_confidence),
            ("type_hint_confidence", self.type_hint_confidence),
            ("remote_min_confidence", self.remote_min_confidence),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.rule_min_score.is_nan() || self.rule_min_score < 0.0 {
            return Err(Error::Config(format!(
                "rule_min_score must be non-negative, got {}",
                self.rule_min_score
            )));
        }
        if self.rule_confidence_scale.is_nan() || self.rule_confidence_scale <= 0.0 {
            return Err(Error::Config(format!(
                "rule_confidence_scale must be positive, got {}",
                self.rule_confidence_scale
            )));
        }
        if self.remote_timeout_ms == 0 {
            return Err(Error::Config("remote_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }
}
