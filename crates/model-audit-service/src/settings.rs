//! Engine tuning knobs
//!
//! Everything here has a default matching the standard scoring model; the CLI
//! overlays values from configuration files and the environment.

use model_audit_core::MetricName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-evaluator time budget
pub const DEFAULT_EVALUATOR_TIMEOUT_MS: u64 = 10_000;

/// Default time budget for one LLM classification
pub const DEFAULT_CLASSIFY_TIMEOUT_MS: u64 = 8_000;

/// Default minimum score for admission
pub const DEFAULT_ADMISSION_THRESHOLD: f64 = 0.5;

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Time budget for each evaluator
    #[serde(default = "default_evaluator_timeout_ms")]
    pub evaluator_timeout_ms: u64,

    /// Time budget for each classifier call
    #[serde(default = "default_classify_timeout_ms")]
    pub classify_timeout_ms: u64,

    /// Every metric must reach this score to be admitted
    #[serde(default = "default_admission_threshold")]
    pub admission_threshold: f64,

    /// Custom net-score weights; the standard table is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<MetricName, f64>>,

    #[serde(default)]
    pub size: SizeSettings,

    #[serde(default)]
    pub ramp_up: RampUpSettings,
}

fn default_evaluator_timeout_ms() -> u64 {
    DEFAULT_EVALUATOR_TIMEOUT_MS
}

fn default_classify_timeout_ms() -> u64 {
    DEFAULT_CLASSIFY_TIMEOUT_MS
}

fn default_admission_threshold() -> f64 {
    DEFAULT_ADMISSION_THRESHOLD
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            evaluator_timeout_ms: default_evaluator_timeout_ms(),
            classify_timeout_ms: default_classify_timeout_ms(),
            admission_threshold: default_admission_threshold(),
            weights: None,
            size: SizeSettings::default(),
            ramp_up: RampUpSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn evaluator_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluator_timeout_ms)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
}

/// Memory budget of one device class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBudget {
    pub name: String,
    pub bytes: u64,
}

impl DeviceBudget {
    pub fn new(name: impl Into<String>, bytes: u64) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Size metric settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeSettings {
    /// File extensions counted as model weights
    #[serde(default = "default_weight_extensions")]
    pub weight_extensions: Vec<String>,

    /// Device classes and their budgets
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceBudget>,

    /// Size/budget ratio at which the score starts to fall
    #[serde(default = "default_ratio_floor")]
    pub ratio_floor: f64,

    /// Size/budget ratio at which the score reaches 0
    #[serde(default = "default_ratio_ceiling")]
    pub ratio_ceiling: f64,
}

fn default_weight_extensions() -> Vec<String> {
    [
        ".bin",
        ".h5",
        ".pt",
        ".pth",
        ".onnx",
        ".tflite",
        ".safetensors",
        ".ckpt",
        ".gguf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_devices() -> Vec<DeviceBudget> {
    vec![
        DeviceBudget::new("raspberry_pi", 750_000_000),
        DeviceBudget::new("jetson_nano", 2_500_000_000),
        DeviceBudget::new("desktop_pc", 8_000_000_000),
        DeviceBudget::new("aws_server", 16_000_000_000),
    ]
}

fn default_ratio_floor() -> f64 {
    0.25
}

fn default_ratio_ceiling() -> f64 {
    1.5
}

impl Default for SizeSettings {
    fn default() -> Self {
        Self {
            weight_extensions: default_weight_extensions(),
            devices: default_devices(),
            ratio_floor: default_ratio_floor(),
            ratio_ceiling: default_ratio_ceiling(),
        }
    }
}

/// Ramp-up metric saturation points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampUpSettings {
    /// README length that earns full documentation credit
    #[serde(default = "default_readme_chars")]
    pub readme_chars: usize,

    /// Number of examples that earns full credit
    #[serde(default = "default_examples")]
    pub examples: usize,

    /// Likes plus stars that earns full popularity credit
    #[serde(default = "default_popularity")]
    pub popularity: u64,
}

fn default_readme_chars() -> usize {
    5_000
}

fn default_examples() -> usize {
    3
}

fn default_popularity() -> u64 {
    1_000
}

impl Default for RampUpSettings {
    fn default() -> Self {
        Self {
            readme_chars: default_readme_chars(),
            examples: default_examples(),
            popularity: default_popularity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.evaluator_timeout(), Duration::from_secs(10));
        assert_eq!(settings.classify_timeout(), Duration::from_secs(8));
        assert_eq!(settings.size.devices.len(), 4);
        assert!(settings.size.weight_extensions.contains(&".safetensors".to_string()));
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let settings: EngineSettings = serde_json::from_value(serde_json::json!({
            "admission_threshold": 0.6,
            "size": {"ratio_ceiling": 2.0},
            "weights": {"license": 1.0}
        }))
        .unwrap();
        assert_eq!(settings.admission_threshold, 0.6);
        assert_eq!(settings.size.ratio_ceiling, 2.0);
        assert_eq!(settings.size.ratio_floor, 0.25);
        assert_eq!(settings.weights.unwrap()[&MetricName::License], 1.0);
    }
}
