//! Pipeline configuration. Loaded from a JSON file; every section has defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// JSON-lines event log
    pub input_path: PathBuf,
    /// Data directory (feature store)
    pub data_dir: PathBuf,
    /// Churn labelling
    pub label: LabelConfig,
    /// Feature extraction parameters
    pub features: FeaturesConfig,
    /// Multicollinearity pruning
    pub reduce: ReduceConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Name of the label column in the feature table
    pub column: String,
    /// Page value that marks an entity as churned
    pub terminal_action: String,
}

/// A raw action count: matches any of `pages` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounter {
    pub name: String,
    pub pages: Vec<String>,
}

impl ActionCounter {
    pub fn new(name: &str, pages: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            pages: pages.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn matches(&self, page: &str) -> bool {
        self.pages.iter().any(|p| p == page)
    }

    /// Column name of the derived daily rate
    pub fn rate_column(&self) -> String {
        format!("avg_daily_{}", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Raw counters turned into daily rates
    pub counters: Vec<ActionCounter>,
    /// Emit `paid` and `male` indicator columns
    pub binary_features: bool,
    /// Denominator used when an observation window has no positive length
    pub degenerate_window_days: f64,
    /// Events per partition for parallel folds
    pub partition_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Absolute correlation above which two features are redundant
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("events.json"),
            data_dir: PathBuf::from(".churn"),
            label: LabelConfig::default(),
            features: FeaturesConfig::default(),
            reduce: ReduceConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            column: "label".to_string(),
            terminal_action: "Cancellation Confirmation".to_string(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            counters: vec![
                ActionCounter::new("songs", &["NextSong"]),
                ActionCounter::new("thumbs_up", &["Thumbs Up"]),
                ActionCounter::new("thumbs_down", &["Thumbs Down"]),
                ActionCounter::new("upgrade", &["Upgrade", "Submit Upgrade"]),
                ActionCounter::new("downgrade", &["Downgrade", "Submit Downgrade"]),
                ActionCounter::new("add_friend", &["Add Friend"]),
                ActionCounter::new("add_playlist", &["Add to Playlist"]),
                ActionCounter::new("advert", &["Roll Advert"]),
                ActionCounter::new("help", &["Help"]),
                ActionCounter::new("error", &["Error"]),
            ],
            binary_features: true,
            degenerate_window_days: 1.0,
            partition_size: 64 * 1024,
        }
    }
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self { threshold: 0.85 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl PipelineConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<PipelineConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
