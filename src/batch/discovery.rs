//! Input discovery for a cropping run.
//!
//! Finds metadata documents in the metadata folder, parses each one and
//! resolves the atlas it refers to. Files that fail either step are kept as
//! skip records so the run can report them and carry on.

use crate::batch::{CropContext, SkippedFile};
use crate::hub::PortraitHub;
use crate::metadata::{load_metadata, resolve_atlas, AtlasMetadata, MetadataFormat, ResolvedAtlas};
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};

/// Metadata file patterns inside the metadata folder.
const METADATA_PATTERNS: &[&str] = &["*.json", "*.json5"];

/// Error during input discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    InvalidPattern(String, glob::PatternError),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::InvalidPattern(pattern, err) => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, err)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::InvalidPattern(_, err) => Some(err),
        }
    }
}

/// A metadata document together with the atlas it describes.
#[derive(Debug, Clone)]
pub struct InputPair {
    pub metadata: AtlasMetadata,
    pub atlas: ResolvedAtlas,
}

impl InputPair {
    /// Short identifier used in progress output (the metadata file name).
    pub fn id(&self) -> String {
        file_label(&self.metadata.source)
    }
}

/// Everything found in the input folders.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Usable pairs, in metadata file name order
    pub pairs: Vec<InputPair>,
    /// Metadata files that could not be used
    pub skipped: Vec<SkippedFile>,
    /// Hub index, when one was found and parsed
    pub hub: Option<PortraitHub>,
    /// Non-fatal problems outside any single pair
    pub warnings: Vec<String>,
    /// Sprites removed because the hub does not list them
    pub hub_dropped: usize,
    /// Sprites the hub lists that were found in atlas metadata
    pub hub_kept: usize,
}

/// Display name for a path: its file name, or the whole path.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Find metadata files directly inside `dir`, sorted by path.
///
/// A missing directory yields no files.
pub fn discover_metadata_files(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = Vec::new();

    // The directory is literal text; only the file name part is a pattern.
    let escaped_dir = PathBuf::from(Pattern::escape(&dir.to_string_lossy()));

    for pattern in METADATA_PATTERNS {
        let full_pattern = escaped_dir.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();
        let paths = glob(&pattern_str)
            .map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

        for path in paths.flatten() {
            if path.is_file() && MetadataFormat::from_path(&path).is_some() {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Discover atlas/metadata pairs for a run.
///
/// Loads the hub first (its portrait size is the fallback untrimmed size),
/// then parses every metadata file and resolves its atlas.
pub fn discover_pairs(ctx: &CropContext) -> Result<Discovery, DiscoveryError> {
    let mut discovery = Discovery::default();
    let metadata_dir = ctx.metadata_dir();
    let atlas_dir = ctx.atlas_dir();
    let hub_path = ctx.hub_path();

    if hub_path.is_file() {
        match PortraitHub::load(&hub_path) {
            Ok(hub) => discovery.hub = Some(hub),
            Err(e) => discovery.warnings.push(format!("{}; continuing without hub", e)),
        }
    }
    let fallback_size = discovery.hub.as_ref().and_then(|h| h.sprite_size());

    for path in discover_metadata_files(&metadata_dir)? {
        if path == hub_path {
            continue;
        }

        let mut metadata = match load_metadata(&path, fallback_size) {
            Ok(metadata) => metadata,
            Err(e) => {
                discovery.skipped.push(SkippedFile { path, reason: e.to_string() });
                continue;
            }
        };

        let atlas = match resolve_atlas(&metadata, &atlas_dir) {
            Ok(atlas) => atlas,
            Err(e) => {
                discovery.skipped.push(SkippedFile { path, reason: e.to_string() });
                continue;
            }
        };

        if let Some(hub) = &discovery.hub {
            let filtered = hub.filter(&mut metadata);
            discovery.hub_kept += filtered.kept;
            discovery.hub_dropped += filtered.dropped;
        }

        discovery.pairs.push(InputPair { metadata, atlas });
    }

    Ok(discovery)
}
