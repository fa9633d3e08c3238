//! YAML configuration for training and evaluation runs.
//!
//! Every section and field is optional; omitted values fall back to the
//! defaults shown below.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "cvusa-baseline"
//!
//! distance:
//!   method: "auto"              # loop | broadcast | linear_algebra | auto
//!   broadcast_max_elements: 1048576
//!
//! mining:
//!   enabled: true
//!   margin: 0.5
//!
//! recall:
//!   use_parallel: true
//!
//! training:
//!   epochs: 10
//!   batch_size: 16
//!   weights_path: "weights/xview.json"
//!   loss_log_path: "logs/losses.tsv"
//!   evaluate_each_epoch: false
//!   resume: false
//!
//! runtime:
//!   threads: 8
//!   log_level: "info"
//!   log_json: false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use distance::{DEFAULT_BROADCAST_MAX_ELEMENTS, DistanceEngine, DistanceMethod};
use mining::DEFAULT_MARGIN;
use recall::RecallEvaluator;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct XviewConfig {
    /// Configuration format version
    #[serde(default = "default_config_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub distance: DistanceYamlConfig,

    #[serde(default)]
    pub mining: MiningYamlConfig,

    #[serde(default)]
    pub recall: RecallYamlConfig,

    #[serde(default)]
    pub training: TrainingYamlConfig,

    #[serde(default)]
    pub runtime: RuntimeYamlConfig,
}

impl XviewConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: XviewConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.distance.validate()?;
        self.mining.validate()?;
        self.training.validate()?;
        self.runtime.validate()?;
        Ok(())
    }
}

impl Default for XviewConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            name: None,
            distance: DistanceYamlConfig::default(),
            mining: MiningYamlConfig::default(),
            recall: RecallYamlConfig::default(),
            training: TrainingYamlConfig::default(),
            runtime: RuntimeYamlConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceYamlConfig {
    #[serde(default)]
    pub method: DistanceMethod,

    #[serde(default = "default_broadcast_max_elements")]
    pub broadcast_max_elements: usize,
}

impl DistanceYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.broadcast_max_elements == 0 {
            return Err(ConfigLoadError::Validation(
                "distance.broadcast_max_elements must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn engine(&self) -> DistanceEngine {
        DistanceEngine::new()
            .with_method(self.method)
            .with_broadcast_max_elements(self.broadcast_max_elements)
    }
}

impl Default for DistanceYamlConfig {
    fn default() -> Self {
        Self {
            method: DistanceMethod::Auto,
            broadcast_max_elements: DEFAULT_BROADCAST_MAX_ELEMENTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningYamlConfig {
    /// Replace naive negatives with the hardest in-batch negative.
    #[serde(default = "true_value")]
    pub enabled: bool,

    #[serde(default = "default_margin")]
    pub margin: f32,
}

impl MiningYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigLoadError::Validation(
                "mining.margin must be a finite value >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MiningYamlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            margin: DEFAULT_MARGIN,
        }
    }
}

/// Recall scoring for the evaluation loop.
///
/// The loop always ranks squared distances, so the rank order is fixed to
/// ascending. Similarity matrices are scored through [`RecallEvaluator`]
/// directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecallYamlConfig {
    #[serde(default)]
    pub use_parallel: bool,
}

impl RecallYamlConfig {
    pub fn evaluator(&self) -> RecallEvaluator {
        RecallEvaluator::new().with_parallel(self.use_parallel)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingYamlConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_weights_path")]
    pub weights_path: PathBuf,

    #[serde(default = "default_loss_log_path")]
    pub loss_log_path: PathBuf,

    #[serde(default)]
    pub evaluate_each_epoch: bool,

    /// Load `weights_path` before the first epoch when it exists.
    #[serde(default)]
    pub resume: bool,
}

impl TrainingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.epochs == 0 {
            return Err(ConfigLoadError::Validation(
                "training.epochs must be >= 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigLoadError::Validation(
                "training.batch_size must be >= 1".to_string(),
            ));
        }
        if self.weights_path.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "training.weights_path must not be empty".to_string(),
            ));
        }
        if self.loss_log_path.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "training.loss_log_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TrainingYamlConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            weights_path: default_weights_path(),
            loss_log_path: default_loss_log_path(),
            evaluate_each_epoch: false,
            resume: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeYamlConfig {
    /// Worker threads for the global compute pool; `None` lets rayon decide.
    #[serde(default)]
    pub threads: Option<usize>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl RuntimeYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.threads == Some(0) {
            return Err(ConfigLoadError::Validation(
                "runtime.threads must be >= 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RuntimeYamlConfig {
    fn default() -> Self {
        Self {
            threads: None,
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

// Helper functions for serde defaults
fn default_config_version() -> String {
    "1.0".to_string()
}
fn true_value() -> bool {
    true
}
fn default_broadcast_max_elements() -> usize {
    DEFAULT_BROADCAST_MAX_ELEMENTS
}
fn default_margin() -> f32 {
    DEFAULT_MARGIN
}
fn default_epochs() -> usize {
    10
}
fn default_batch_size() -> usize {
    16
}
fn default_weights_path() -> PathBuf {
    PathBuf::from("weights/xview.json")
}
fn default_loss_log_path() -> PathBuf {
    PathBuf::from("logs/losses.tsv")
}
fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: "1.0"
name: "cvusa"
distance:
  method: "linear_algebra"
recall:
  use_parallel: true
training:
  epochs: 3
  resume: true
"#;

        let config = XviewConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name, Some("cvusa".to_string()));
        assert_eq!(config.distance.method, DistanceMethod::LinearAlgebra);
        assert!(config.recall.use_parallel);
        assert_eq!(config.training.epochs, 3);
        assert!(config.training.resume);
        assert_eq!(config.training.batch_size, 16);
        assert!(config.mining.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
version: "1"
mining:
  margin: 0.2
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = XviewConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.version, "1");
        assert!((config.mining.margin - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = XviewConfig::from_yaml("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.distance.method, DistanceMethod::Auto);
        assert_eq!(config.mining.margin, DEFAULT_MARGIN);
        assert_eq!(config.training.epochs, 10);
        assert!(!config.training.resume);
        assert!(!config.recall.use_parallel);
        assert!(config.runtime.threads.is_none());
    }

    #[test]
    fn test_unsupported_version() {
        let result = XviewConfig::from_yaml("version: \"2.0\"\n");
        assert!(matches!(
            result,
            Err(ConfigLoadError::UnsupportedVersion(v)) if v == "2.0"
        ));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("mining:\n  margin: -1.0\n", "margin"),
            ("training:\n  epochs: 0\n", "epochs"),
            ("training:\n  batch_size: 0\n", "batch_size"),
            ("runtime:\n  threads: 0\n", "threads"),
            ("distance:\n  broadcast_max_elements: 0\n", "broadcast_max_elements"),
        ];
        for (yaml, field) in cases {
            let err = XviewConfig::from_yaml(yaml).unwrap_err();
            assert!(
                err.to_string().contains(field),
                "{yaml:?} should mention {field}, got {err}"
            );
        }
    }

    #[test]
    fn test_unknown_method_is_a_parse_error() {
        let result = XviewConfig::from_yaml("distance:\n  method: \"cosine\"\n");
        assert!(matches!(result, Err(ConfigLoadError::YamlParse(_))));
    }

    #[test]
    fn test_sections_build_components() {
        let config = XviewConfig::from_yaml(
            "distance:\n  method: \"broadcast\"\nrecall:\n  use_parallel: true\n",
        )
        .unwrap();
        let engine = config.distance.engine();
        assert_eq!(engine.method, DistanceMethod::Broadcast);
        assert_eq!(engine.broadcast_max_elements, DEFAULT_BROADCAST_MAX_ELEMENTS);
        assert!(config.recall.evaluator().use_parallel);
    }

    #[test]
    fn test_recall_order_key_is_ignored() {
        let config = XviewConfig::from_yaml("recall:\n  order: \"descending\"\n").unwrap();
        assert_eq!(config.recall.evaluator().order, recall::RankOrder::Ascending);
    }
}
