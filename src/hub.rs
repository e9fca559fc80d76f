//! Portrait hub index
//!
//! The hub lists every portrait the game knows about, which atlas index
//! holds it, and the canonical portrait size. When a hub file sits next to
//! the atlas metadata it narrows each atlas down to the portraits it
//! actually owns and supplies the untrimmed size for entries that lack one.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metadata::AtlasMetadata;
use crate::models::Size;

/// Default hub file name inside the metadata directory.
pub const DEFAULT_HUB_NAME: &str = "portrait_hub.json";

/// Error loading a hub file.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("failed to read hub {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed hub {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawHub {
    #[serde(rename = "_sprites", alias = "sprites")]
    sprites: Vec<RawHubSprite>,
    #[serde(default, rename = "_spriteSize", alias = "spriteSize")]
    sprite_size: Option<Size>,
    #[serde(default, rename = "_rootAtlasName", alias = "rootAtlasName")]
    root_atlas_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHubSprite {
    name: String,
    #[serde(default)]
    atlas: Option<i64>,
}

/// Parsed portrait hub.
#[derive(Debug, Clone, Default)]
pub struct PortraitHub {
    sprite_size: Option<Size>,
    root_atlas_name: Option<String>,
    by_atlas: HashMap<i64, HashSet<String>>,
    names: HashSet<String>,
    sprite_count: usize,
}

/// How many sprites of one atlas survived hub filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubFilter {
    pub kept: usize,
    pub dropped: usize,
}

impl PortraitHub {
    /// Parse a hub from JSON text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let raw: RawHub = serde_json::from_str(text)?;

        let mut hub = PortraitHub {
            sprite_size: raw.sprite_size,
            root_atlas_name: raw.root_atlas_name,
            sprite_count: raw.sprites.len(),
            ..Default::default()
        };
        for sprite in raw.sprites {
            if let Some(index) = sprite.atlas {
                hub.by_atlas.entry(index).or_default().insert(sprite.name.clone());
            }
            hub.names.insert(sprite.name);
        }
        Ok(hub)
    }

    /// Load a hub file from disk.
    pub fn load(path: &Path) -> Result<Self, HubError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| HubError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&text).map_err(|source| HubError::Parse { path: path.to_path_buf(), source })
    }

    /// Canonical portrait size, if the hub declares one.
    pub fn sprite_size(&self) -> Option<Size> {
        self.sprite_size
    }

    /// Name prefix shared by the hub's atlas metadata files.
    pub fn root_atlas_name(&self) -> Option<&str> {
        self.root_atlas_name.as_deref()
    }

    /// Number of sprite entries listed in the hub (duplicates included).
    pub fn sprite_count(&self) -> usize {
        self.sprite_count
    }

    /// Whether the hub lists `name` for the given atlas index.
    ///
    /// Without an index the name is looked up across all atlases.
    pub fn contains(&self, index: Option<i64>, name: &str) -> bool {
        match index {
            Some(index) => self.by_atlas.get(&index).is_some_and(|names| names.contains(name)),
            None => self.names.contains(name),
        }
    }

    /// Drop sprites of `metadata` that the hub does not assign to its atlas.
    pub fn filter(&self, metadata: &mut AtlasMetadata) -> HubFilter {
        let before = metadata.sprites.len();
        let index = metadata.index;
        metadata.sprites.retain(|sprite| self.contains(index, &sprite.name));
        let kept = metadata.sprites.len();
        HubFilter { kept, dropped: before - kept }
    }
}
