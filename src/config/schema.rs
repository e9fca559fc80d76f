//! Configuration schema types for `portraits.toml`
//!
//! Defines the structure and validation rules for a cropping run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::archive::{DirLayout, DEFAULT_ATLAS_DIR, DEFAULT_METADATA_DIR};
use crate::hub::DEFAULT_HUB_NAME;
use crate::output::{OutputFormat, OutputWriter, DEFAULT_WEBP_QUALITY};

/// Where atlases and their metadata are read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Input root holding the atlas and metadata folders
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Atlas image folder, relative to the root
    #[serde(default = "default_atlas_dir")]
    pub atlas_dir: String,
    /// Metadata folder, relative to the root
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,
    /// Hub file, relative to the metadata folder. Ignored when absent.
    #[serde(default = "default_hub")]
    pub hub: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_atlas_dir() -> String {
    DEFAULT_ATLAS_DIR.to_string()
}

fn default_metadata_dir() -> String {
    DEFAULT_METADATA_DIR.to_string()
}

fn default_hub() -> PathBuf {
    PathBuf::from(DEFAULT_HUB_NAME)
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            atlas_dir: default_atlas_dir(),
            metadata_dir: default_metadata_dir(),
            hub: default_hub(),
        }
    }
}

impl InputConfig {
    /// Folder names as a staging layout.
    pub fn layout(&self) -> DirLayout {
        DirLayout { metadata_dir: self.metadata_dir.clone(), atlas_dir: self.atlas_dir.clone() }
    }
}

/// Where and how portraits are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,
    /// Output encoding
    #[serde(default)]
    pub format: OutputFormat,
    /// Lossy WebP quality (0-100)
    #[serde(default = "default_webp_quality")]
    pub webp_quality: f32,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("_output")
}

fn default_webp_quality() -> f32 {
    DEFAULT_WEBP_QUALITY
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            format: OutputFormat::default(),
            webp_quality: default_webp_quality(),
        }
    }
}

impl OutputConfig {
    pub fn writer(&self) -> OutputWriter {
        OutputWriter::new(self.format).with_webp_quality(self.webp_quality)
    }
}

/// Execution settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Worker threads; defaults to the available parallelism
    #[serde(default)]
    pub jobs: Option<usize>,
}

/// Complete `portraits.toml` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "output.webp_quality")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "portraits.toml: '{}' {}", self.field, self.message)
    }
}

impl CropConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        for (field, value) in
            [("input.atlas_dir", &self.input.atlas_dir), ("input.metadata_dir", &self.input.metadata_dir)]
        {
            if value.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be a non-empty folder name".to_string(),
                });
            }
        }

        if !(0.0..=100.0).contains(&self.output.webp_quality) {
            errors.push(ConfigValidationError {
                field: "output.webp_quality".to_string(),
                message: "must be between 0 and 100".to_string(),
            });
        }

        if self.output.dir.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "output.dir".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.run.jobs == Some(0) {
            errors.push(ConfigValidationError {
                field: "run.jobs".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
