//! Configuration loading and discovery for `portraits.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::CropConfig;
use crate::output::OutputFormat;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "portraits.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse portraits.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override input root
    pub root: Option<PathBuf>,
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override output format
    pub format: Option<OutputFormat>,
    /// Override WebP quality
    pub webp_quality: Option<f32>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// A loaded configuration and the directory its relative paths resolve from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CropConfig,
    /// Directory of the config file, or the working directory without one
    pub base_dir: PathBuf,
    /// Path of the file the config came from
    pub source: Option<PathBuf>,
}

/// Find portraits.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find portraits.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a portraits.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration rooted at the working directory.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let config = load_config_file(&p)?;
            let base_dir = match config_root(&p) {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => env::current_dir()?,
            };
            Ok(LoadedConfig { config, base_dir, source: Some(p) })
        }
        None => Ok(LoadedConfig {
            config: CropConfig::default(),
            base_dir: env::current_dir()?,
            source: None,
        }),
    }
}

/// Load configuration from a specific file path.
pub fn load_config_file(path: &Path) -> Result<CropConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: CropConfig = toml::from_str(&contents)?;
    check(&config)?;
    Ok(config)
}

/// Turn validation findings into a `ConfigError`.
pub fn check(config: &CropConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut CropConfig, overrides: &CliOverrides) {
    if let Some(ref root) = overrides.root {
        config.input.root = root.clone();
    }

    if let Some(ref out) = overrides.out {
        config.output.dir = out.clone();
    }

    if let Some(format) = overrides.format {
        config.output.format = format;
    }

    if let Some(quality) = overrides.webp_quality {
        config.output.webp_quality = quality;
    }

    if let Some(jobs) = overrides.jobs {
        config.run.jobs = Some(jobs);
    }
}

/// Get the directory a config file's relative paths resolve from.
pub fn config_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to a base directory.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the base.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
