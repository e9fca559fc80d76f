//! Crop context containing configuration and paths for a run.

use crate::config::CropConfig;
use crate::output::OutputWriter;
use std::path::{Component, Path, PathBuf};

/// Default number of parallel jobs (uses available parallelism).
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Crop context containing configuration and paths for a run.
///
/// Relative paths in the configuration resolve against `base_dir`, which is
/// the directory of `portraits.toml` or the working directory.
#[derive(Debug, Clone)]
pub struct CropContext {
    config: CropConfig,
    base_dir: PathBuf,
}

impl CropContext {
    pub fn new(config: CropConfig, base_dir: PathBuf) -> Self {
        Self { config, base_dir }
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a path relative to the base directory.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the base directory. `.` components are
    /// dropped so `root = "."` resolves to the base directory itself.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() { path.to_path_buf() } else { self.base_dir.join(path) };
        joined.components().filter(|c| !matches!(c, Component::CurDir)).collect()
    }

    /// Input root holding the atlas and metadata folders.
    pub fn input_root(&self) -> PathBuf {
        self.resolve_path(&self.config.input.root)
    }

    pub fn atlas_dir(&self) -> PathBuf {
        self.input_root().join(&self.config.input.atlas_dir)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.input_root().join(&self.config.input.metadata_dir)
    }

    /// Hub file location; relative hub paths live in the metadata folder.
    pub fn hub_path(&self) -> PathBuf {
        let hub = &self.config.input.hub;
        if hub.is_absolute() {
            hub.clone()
        } else {
            self.metadata_dir().join(hub)
        }
    }

    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.output.dir)
    }

    /// Worker threads for this run.
    pub fn jobs(&self) -> usize {
        self.config.run.jobs.unwrap_or_else(default_jobs).max(1)
    }

    pub fn writer(&self) -> OutputWriter {
        self.config.output.writer()
    }
}
