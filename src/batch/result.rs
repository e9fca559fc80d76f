//! Crop result types.
//!
//! Contains types for representing the outcome of a cropping run.

use std::path::PathBuf;
use std::time::Duration;

/// Outcome of a single sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpriteOutcome {
    /// Portrait written to disk
    Written(PathBuf),
    /// Extraction, encoding or writing failed
    Failed(String),
}

impl SpriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SpriteOutcome::Written(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SpriteOutcome::Failed(_))
    }
}

impl std::fmt::Display for SpriteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpriteOutcome::Written(path) => write!(f, "written to {}", path.display()),
            SpriteOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of cropping one sprite.
#[derive(Debug, Clone)]
pub struct SpriteResult {
    /// Metadata file the sprite came from
    pub pair_id: String,
    /// Sprite name
    pub name: String,
    pub outcome: SpriteOutcome,
    pub duration: Duration,
}

impl SpriteResult {
    pub fn written(pair_id: String, name: String, path: PathBuf, duration: Duration) -> Self {
        Self { pair_id, name, outcome: SpriteOutcome::Written(path), duration }
    }

    pub fn failed(pair_id: String, name: String, error: String, duration: Duration) -> Self {
        Self { pair_id, name, outcome: SpriteOutcome::Failed(error), duration }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// A metadata file or pair that produced no sprites at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// How much of the portrait hub the run found in atlas metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubCoverage {
    /// Hub `_rootAtlasName`, when declared
    pub name: Option<String>,
    /// Sprite entries the hub lists
    pub listed: usize,
    /// Atlas sprites the hub lists, before deduplication
    pub matched: usize,
    /// Atlas sprites the hub does not list
    pub ignored: usize,
}

/// Result of a complete cropping run.
#[derive(Debug, Default)]
pub struct CropResult {
    /// Per-sprite results, ordered by pair then source order
    pub sprites: Vec<SpriteResult>,
    /// Files skipped during discovery or atlas decoding
    pub skipped: Vec<SkippedFile>,
    /// Duplicate entries dropped across all pairs
    pub duplicates: usize,
    /// Pairs processed
    pub pairs: usize,
    /// Hub coverage, when a hub was loaded
    pub hub: Option<HubCoverage>,
    pub total_duration: Duration,
}

impl CropResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sprite(&mut self, result: SpriteResult) {
        self.sprites.push(result);
    }

    pub fn add_skipped(&mut self, skipped: SkippedFile) {
        self.skipped.push(skipped);
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Number of portraits written.
    pub fn extracted_count(&self) -> usize {
        self.sprites.iter().filter(|r| r.is_success()).count()
    }

    /// Number of sprites that failed.
    pub fn failed_count(&self) -> usize {
        self.sprites.iter().filter(|r| r.outcome.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Whether every discovered sprite and file was processed.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0 && self.skipped.is_empty()
    }

    /// Paths of all written portraits.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.sprites
            .iter()
            .filter_map(|r| match &r.outcome {
                SpriteOutcome::Written(path) => Some(path),
                SpriteOutcome::Failed(_) => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<&SpriteResult> {
        self.sprites.iter().filter(|r| r.outcome.is_failure()).collect()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Cropped {} portraits from {} atlases: {} failed, {} files skipped, {} duplicates ignored ({:?})",
            self.extracted_count(),
            self.pairs,
            self.failed_count(),
            self.skipped_count(),
            self.duplicates,
            self.total_duration
        )];

        if let Some(hub) = &self.hub {
            lines.push(format!(
                "Hub{}: {}/{} listed portraits found, {} unlisted sprites ignored",
                hub.name.as_deref().map(|n| format!(" '{}'", n)).unwrap_or_default(),
                hub.matched,
                hub.listed,
                hub.ignored
            ));
        }

        for failure in self.failures() {
            lines.push(format!("  - {}/{}: {}", failure.pair_id, failure.name, failure.outcome));
        }

        for skipped in self.skipped.iter().take(5) {
            lines.push(format!("  - skipped {}: {}", skipped.path.display(), skipped.reason));
        }
        if self.skipped.len() > 5 {
            lines.push(format!("  ... and {} more", self.skipped.len() - 5));
        }

        lines.join("\n")
    }
}
