//! Pipeline Configuration Module
//! Paths, chart sizes and parsing rules passed explicitly into the pipeline.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "coverage_charts.json";

/// Campaign rounds in display order.
pub const DEFAULT_CAMPAIGN_ORDER: [&str; 6] = [
    "Nov SIA 2024",
    "Dec NID 2024",
    "Feb NID 2025",
    "Mar SIA 2025",
    "Apr NID 2025",
    "May NID 2025",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Io { .. } => ErrorKind::Io,
            ConfigError::Json { .. } => ErrorKind::Format,
        }
    }
}

/// What to do with a Campaign label outside `campaign_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCampaignPolicy {
    /// Order unknown labels after the known ones, first-seen first.
    #[default]
    Append,
    /// Fail the run.
    Reject,
}

/// Chart text shown around the plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartText {
    pub summary_title: String,
    pub trend_title: String,
    pub subtitle: String,
    pub caption: String,
}

impl Default for ChartText {
    fn default() -> Self {
        Self {
            summary_title: "PCA Coverage by Region".to_string(),
            trend_title: "PCA Coverage Trend by Region".to_string(),
            subtitle: "Nov SIA 2024 to May NID 2025".to_string(),
            caption: "Source: Post Campaign Assessment (PCA) data. Dashed line: 95% target"
                .to_string(),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub summary_png: String,
    pub trend_png: String,
    pub document: String,
    /// Write the cleaned long table here (relative to `output_dir`).
    pub tidy_csv: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Zero-based row promoted to column headers.
    pub header_row: usize,
    pub region_column: String,
    pub excluded_regions: Vec<String>,
    pub campaign_order: Vec<String>,
    pub unknown_campaigns: UnknownCampaignPolicy,
    pub target: f64,
    pub y_max: f64,
    pub text: ChartText,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/pca_coverage.xlsx"),
            output_dir: PathBuf::from("output"),
            summary_png: "pca_coverage_summary.png".to_string(),
            trend_png: "pca_coverage_trend.png".to_string(),
            document: "pca_coverage_charts.pptx".to_string(),
            tidy_csv: None,
            width: 1200,
            height: 800,
            header_row: 1,
            region_column: "Region".to_string(),
            excluded_regions: vec!["Total".to_string()],
            campaign_order: DEFAULT_CAMPAIGN_ORDER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unknown_campaigns: UnknownCampaignPolicy::default(),
            target: 0.95,
            y_max: 1.05,
            text: ChartText::default(),
        }
    }
}

impl PipelineConfig {
    /// Load config from a JSON file, falling back to defaults when it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn summary_png_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_png)
    }

    pub fn trend_png_path(&self) -> PathBuf {
        self.output_dir.join(&self.trend_png)
    }

    pub fn document_path(&self) -> PathBuf {
        self.output_dir.join(&self.document)
    }

    pub fn tidy_csv_path(&self) -> Option<PathBuf> {
        self.tidy_csv.as_ref().map(|name| self.output_dir.join(name))
    }
}
