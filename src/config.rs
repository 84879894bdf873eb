//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.persona.toml` files.

use crate::analysis::Segmenter;
use crate::persona::bucket::REFERENCE_BOUNDARIES;
use crate::persona::AgeBuckets;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".persona.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Age bucket settings.
    #[serde(default)]
    pub buckets: BucketConfig,

    /// Segment settings.
    #[serde(default)]
    pub segments: SegmentConfig,

    /// Interactive lookup settings.
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Input CSV location and column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the transactions CSV.
    #[serde(default = "default_data_path")]
    pub path: PathBuf,

    #[serde(default = "default_country_column")]
    pub country: String,

    #[serde(default = "default_platform_column")]
    pub platform: String,

    #[serde(default = "default_sex_column")]
    pub sex: String,

    #[serde(default = "default_age_column")]
    pub age: String,

    #[serde(default = "default_price_column")]
    pub price: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            country: default_country_column(),
            platform: default_platform_column(),
            sex: default_sex_column(),
            age: default_age_column(),
            price: default_price_column(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("persona.csv")
}

fn default_country_column() -> String {
    "COUNTRY".to_string()
}

fn default_platform_column() -> String {
    "SOURCE".to_string()
}

fn default_sex_column() -> String {
    "SEX".to_string()
}

fn default_age_column() -> String {
    "AGE".to_string()
}

fn default_price_column() -> String {
    "PRICE".to_string()
}

/// Age bucket boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    #[serde(default = "default_boundaries")]
    pub boundaries: Vec<i64>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            boundaries: default_boundaries(),
        }
    }
}

fn default_boundaries() -> Vec<i64> {
    REFERENCE_BOUNDARIES.to_vec()
}

/// Segment labels, lowest revenue first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            labels: default_labels(),
        }
    }
}

fn default_labels() -> Vec<String> {
    crate::analysis::segmenter::REFERENCE_LABELS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Interactive lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Attempts allowed per field before the session gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Length country input is truncated to when it is not a known code.
    #[serde(default = "default_country_code_len")]
    pub country_code_len: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            country_code_len: default_country_code_len(),
        }
    }
}

fn default_max_attempts() -> usize {
    5
}

fn default_country_code_len() -> usize {
    3
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Report generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// List every persona, not just segment statistics.
    #[serde(default = "default_true")]
    pub include_personas: bool,

    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_personas: true,
            format: ReportFormat::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values the user passed explicitly override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.data.path = input.clone();
        }
        if let Some(ref boundaries) = args.boundaries {
            self.buckets.boundaries = boundaries.clone();
        }
        if let Some(ref labels) = args.labels {
            self.segments.labels = labels.clone();
        }
        if let Some(max_attempts) = args.max_attempts {
            self.lookup.max_attempts = max_attempts;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if args.no_personas {
            self.report.include_personas = false;
        }
    }

    /// Check settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.age_buckets()?;
        self.segmenter()?;
        if self.lookup.max_attempts == 0 {
            bail!("lookup.max_attempts must be at least 1");
        }
        if self.lookup.country_code_len == 0 {
            bail!("lookup.country_code_len must be at least 1");
        }
        Ok(())
    }

    pub fn age_buckets(&self) -> Result<AgeBuckets> {
        Ok(AgeBuckets::new(self.buckets.boundaries.clone())?)
    }

    pub fn segmenter(&self) -> Result<Segmenter> {
        Ok(Segmenter::new(self.segments.labels.iter().cloned())?)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
