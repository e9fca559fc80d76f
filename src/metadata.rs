//! Atlas metadata parsing
//!
//! Reads one metadata document per atlas and turns its sprite entries into
//! [`SpriteDescriptor`]s. Two document layouts are understood:
//!
//! - the native layout (`atlas`, `alpha`, `sprites`, `spriteSize`, `origin`)
//! - the game-asset layout dumped by asset tools (`_sprites`, `_index`,
//!   `_sign.m_atlases`, `_sign.m_alphas`), whose rectangles use a
//!   bottom-left origin
//!
//! Documents may be strict JSON (`.json`) or JSON5 (`.json5`).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Offset, Origin, Rect, Size, SpriteDescriptor};

/// Error while reading or resolving a metadata document.
///
/// Every variant causes the whole metadata file to be skipped.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Malformed document
    #[error("malformed metadata {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    /// A sprite entry lacks a required field
    #[error("{}: sprite #{index} is missing required field '{field}'", .path.display())]
    MissingField { path: PathBuf, index: usize, field: &'static str },
    /// Well-formed but not something we know how to crop
    #[error("unsupported metadata {}: {reason}", .path.display())]
    Unsupported { path: PathBuf, reason: String },
    /// The referenced atlas (or alpha mask) is not on disk
    #[error("{}: atlas image '{}' not found", .metadata.display(), .atlas.display())]
    MissingAtlas { metadata: PathBuf, atlas: PathBuf },
}

impl MetadataError {
    /// Whether this is a missing-atlas condition rather than a parse failure.
    pub fn is_missing_atlas(&self) -> bool {
        matches!(self, MetadataError::MissingAtlas { .. })
    }
}

/// Text syntax of a metadata document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    Json,
    Json5,
}

impl MetadataFormat {
    /// Detect the syntax from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "json" => Some(MetadataFormat::Json),
            Some(ext) if ext == "json5" => Some(MetadataFormat::Json5),
            _ => None,
        }
    }
}

/// A parsed metadata document for one atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasMetadata {
    /// File the document was read from
    pub source: PathBuf,
    /// Atlas image reference (file stem inside the atlas directory)
    pub atlas: String,
    /// Optional alpha-mask image reference
    pub alpha: Option<String>,
    /// Coordinate origin of the sprite rectangles
    pub origin: Origin,
    /// Atlas index used by the portrait hub
    pub index: Option<i64>,
    /// Sprites in source order, duplicates included
    pub sprites: Vec<SpriteDescriptor>,
}

/// On-disk images backing one metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAtlas {
    pub image: PathBuf,
    pub alpha: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default, alias = "_sprites")]
    sprites: Option<Vec<RawSprite>>,
    #[serde(default)]
    atlas: Option<String>,
    #[serde(default)]
    alpha: Option<String>,
    #[serde(default)]
    origin: Option<Origin>,
    #[serde(default, rename = "spriteSize", alias = "_spriteSize", alias = "sprite_size")]
    sprite_size: Option<Size>,
    #[serde(default, rename = "_index", alias = "index")]
    index: Option<i64>,
    #[serde(default, rename = "_sign")]
    sign: Option<RawSign>,
}

#[derive(Debug, Deserialize)]
struct RawSprite {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rect: Option<Rect>,
    #[serde(default, alias = "rotated")]
    rotate: Option<Flag>,
    #[serde(default, alias = "flipped")]
    flip: Option<Flag>,
    #[serde(default, rename = "originalSize", alias = "original_size", alias = "sourceSize")]
    original_size: Option<Size>,
    #[serde(default, alias = "trimOffset", alias = "trim_offset")]
    offset: Option<Offset>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSign {
    #[serde(default)]
    m_atlases: Vec<RawAssetRef>,
    #[serde(default)]
    m_alphas: Vec<RawAssetRef>,
}

#[derive(Debug, Deserialize)]
struct RawAssetRef {
    #[serde(default)]
    name: Option<String>,
}

/// Boolean flag that asset dumps encode as 0/1.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// Parse a metadata document from text.
///
/// `fallback_size` is used as the untrimmed size for sprites that declare
/// none and whose document has no `spriteSize` (normally the hub size).
pub fn parse_metadata_str(
    text: &str,
    format: MetadataFormat,
    source: &Path,
    fallback_size: Option<Size>,
) -> Result<AtlasMetadata, MetadataError> {
    let raw: RawDocument = match format {
        MetadataFormat::Json => serde_json::from_str(text)
            .map_err(|e| MetadataError::Parse { path: source.to_path_buf(), message: e.to_string() })?,
        MetadataFormat::Json5 => json5::from_str(text)
            .map_err(|e| MetadataError::Parse { path: source.to_path_buf(), message: e.to_string() })?,
    };

    let (sign_atlas, sign_alpha) = match &raw.sign {
        Some(sign) => {
            if sign.m_atlases.len() != 1 {
                return Err(MetadataError::Unsupported {
                    path: source.to_path_buf(),
                    reason: format!(
                        "expected exactly one atlas image, found {}",
                        sign.m_atlases.len()
                    ),
                });
            }
            if sign.m_alphas.len() > 1 {
                return Err(MetadataError::Unsupported {
                    path: source.to_path_buf(),
                    reason: format!(
                        "expected at most one alpha image, found {}",
                        sign.m_alphas.len()
                    ),
                });
            }
            let atlas = sign.m_atlases[0].name.clone();
            let alpha = sign.m_alphas.first().and_then(|a| a.name.clone());
            (atlas, alpha)
        }
        None => (None, None),
    };

    let atlas = raw
        .atlas
        .or(sign_atlas)
        .or_else(|| source.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| MetadataError::Parse {
            path: source.to_path_buf(),
            message: "cannot determine atlas image name".to_string(),
        })?;
    let alpha = raw.alpha.or(sign_alpha).filter(|name| !name.is_empty());

    let origin = raw.origin.unwrap_or(if raw.sign.is_some() {
        Origin::BottomLeft
    } else {
        Origin::TopLeft
    });

    let raw_sprites = raw.sprites.ok_or_else(|| MetadataError::Parse {
        path: source.to_path_buf(),
        message: "missing sprite list".to_string(),
    })?;
    if raw_sprites.is_empty() {
        return Err(MetadataError::Parse {
            path: source.to_path_buf(),
            message: "document lists no sprites".to_string(),
        });
    }

    let default_size = raw.sprite_size.or(fallback_size);
    let sprites = raw_sprites
        .into_iter()
        .enumerate()
        .map(|(index, sprite)| build_descriptor(sprite, index, source, default_size))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AtlasMetadata {
        source: source.to_path_buf(),
        atlas,
        alpha,
        origin,
        index: raw.index,
        sprites,
    })
}

fn build_descriptor(
    raw: RawSprite,
    index: usize,
    source: &Path,
    default_size: Option<Size>,
) -> Result<SpriteDescriptor, MetadataError> {
    let missing = |field| MetadataError::MissingField { path: source.to_path_buf(), index, field };

    let name = raw.name.filter(|n| !n.is_empty()).ok_or_else(|| missing("name"))?;
    let rect = raw.rect.ok_or_else(|| missing("rect"))?;

    let sprite = SpriteDescriptor::new(name, rect)
        .with_rotated(raw.rotate.map(Flag::is_set).unwrap_or(false))
        .with_flipped(raw.flip.map(Flag::is_set).unwrap_or(false));

    let effective = sprite.effective_size();
    let original_size = raw.original_size.or(default_size).unwrap_or(effective);
    let trim_offset = raw
        .offset
        .unwrap_or_else(|| SpriteDescriptor::bottom_right_offset(original_size, effective));

    Ok(sprite.with_original_size(original_size).with_trim_offset(trim_offset))
}

/// Read and parse a metadata file, picking the syntax from its extension.
pub fn load_metadata(path: &Path, fallback_size: Option<Size>) -> Result<AtlasMetadata, MetadataError> {
    let format = MetadataFormat::from_path(path).ok_or_else(|| MetadataError::Unsupported {
        path: path.to_path_buf(),
        reason: "unknown file extension".to_string(),
    })?;
    let text = std::fs::read_to_string(path)
        .map_err(|source| MetadataError::Io { path: path.to_path_buf(), source })?;
    parse_metadata_str(&text, format, path, fallback_size)
}

/// Path of an atlas image reference inside `atlas_dir`.
///
/// References are file stems; a trailing `.png` is tolerated.
pub fn atlas_image_path(atlas_dir: &Path, reference: &str) -> PathBuf {
    if reference.to_ascii_lowercase().ends_with(".png") {
        atlas_dir.join(reference)
    } else {
        atlas_dir.join(format!("{}.png", reference))
    }
}

/// Resolve the atlas (and alpha mask) named by `metadata` to files on disk.
pub fn resolve_atlas(metadata: &AtlasMetadata, atlas_dir: &Path) -> Result<ResolvedAtlas, MetadataError> {
    let image = atlas_image_path(atlas_dir, &metadata.atlas);
    if !image.is_file() {
        return Err(MetadataError::MissingAtlas { metadata: metadata.source.clone(), atlas: image });
    }

    let alpha = match &metadata.alpha {
        Some(reference) => {
            let path = atlas_image_path(atlas_dir, reference);
            if !path.is_file() {
                return Err(MetadataError::MissingAtlas { metadata: metadata.source.clone(), atlas: path });
            }
            Some(path)
        }
        None => None,
    };

    Ok(ResolvedAtlas { image, alpha })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<AtlasMetadata, MetadataError> {
        parse_metadata_str(text, MetadataFormat::Json, Path::new("meta/pack0.json"), None)
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(MetadataFormat::from_path(Path::new("a.json")), Some(MetadataFormat::Json));
        assert_eq!(MetadataFormat::from_path(Path::new("a.JSON5")), Some(MetadataFormat::Json5));
        assert_eq!(MetadataFormat::from_path(Path::new("a.png")), None);
        assert_eq!(MetadataFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_native_layout() {
        let meta = parse(
            r#"{
                "atlas": "atlas_a",
                "alpha": "atlas_a_alpha",
                "sprites": [
                    {"name": "hero", "rect": {"x": 1, "y": 2, "w": 3, "h": 4},
                     "rotate": true, "flip": true,
                     "originalSize": {"w": 8, "h": 8}, "offset": {"x": 1, "y": 1}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(meta.atlas, "atlas_a");
        assert_eq!(meta.alpha.as_deref(), Some("atlas_a_alpha"));
        assert_eq!(meta.origin, Origin::TopLeft);
        assert_eq!(meta.sprites.len(), 1);

        let hero = &meta.sprites[0];
        assert_eq!(hero.name, "hero");
        assert_eq!(hero.rect, Rect::new(1, 2, 3, 4));
        assert!(hero.rotated);
        assert!(hero.flipped);
        assert_eq!(hero.original_size, Size::new(8, 8));
        assert_eq!(hero.trim_offset, Offset::new(1, 1));
    }

    #[test]
    fn test_atlas_defaults_to_file_stem() {
        let meta = parse(r#"{"sprites": [{"name": "a", "rect": {"x": 0, "y": 0, "w": 1, "h": 1}}]}"#)
            .unwrap();
        assert_eq!(meta.atlas, "pack0");
        assert!(meta.alpha.is_none());
    }

    #[test]
    fn test_parse_game_asset_layout() {
        let meta = parse(
            r#"{
                "_index": 3,
                "_sign": {
                    "m_atlases": [{"name": "pack3"}],
                    "m_alphas": [{"name": "pack3_alpha"}]
                },
                "_sprites": [
                    {"name": "char_1", "guid": "x", "atlas": 3,
                     "rect": {"x": 0, "y": 0, "w": 4, "h": 2}, "rotate": 1},
                    {"name": "char_2", "guid": "y", "atlas": 3,
                     "rect": {"x": 4, "y": 0, "w": 2, "h": 2}, "rotate": 0}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(meta.atlas, "pack3");
        assert_eq!(meta.alpha.as_deref(), Some("pack3_alpha"));
        assert_eq!(meta.origin, Origin::BottomLeft);
        assert_eq!(meta.index, Some(3));
        assert!(meta.sprites[0].rotated);
        assert!(!meta.sprites[1].rotated);
    }

    #[test]
    fn test_sign_with_two_atlases_is_unsupported() {
        let err = parse(
            r#"{"_sign": {"m_atlases": [{"name": "a"}, {"name": "b"}], "m_alphas": []},
                "_sprites": [{"name": "x", "rect": {"x": 0, "y": 0, "w": 1, "h": 1}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MetadataError::Unsupported { .. }));
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_missing_name_is_reported_with_index() {
        let err = parse(
            r#"{"sprites": [
                {"name": "ok", "rect": {"x": 0, "y": 0, "w": 1, "h": 1}},
                {"rect": {"x": 0, "y": 0, "w": 1, "h": 1}}
            ]}"#,
        )
        .unwrap_err();
        match err {
            MetadataError::MissingField { index, field, .. } => {
                assert_eq!(index, 1);
                assert_eq!(field, "name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_rect_field() {
        let err = parse(r#"{"sprites": [{"name": "a"}]}"#).unwrap_err();
        assert!(matches!(err, MetadataError::MissingField { field: "rect", .. }));
    }

    #[test]
    fn test_incomplete_rect_is_parse_error() {
        let err = parse(r#"{"sprites": [{"name": "a", "rect": {"x": 0, "y": 0, "w": 1}}]}"#)
            .unwrap_err();
        assert!(matches!(err, MetadataError::Parse { .. }));
    }

    #[test]
    fn test_empty_and_missing_sprite_lists() {
        assert!(matches!(parse(r#"{"sprites": []}"#), Err(MetadataError::Parse { .. })));
        assert!(matches!(parse(r#"{"atlas": "a"}"#), Err(MetadataError::Parse { .. })));
        assert!(matches!(parse("not json"), Err(MetadataError::Parse { .. })));
    }

    #[test]
    fn test_original_size_fallback_chain() {
        // per-sprite size wins over document size
        let meta = parse(
            r#"{"spriteSize": {"width": 10, "height": 10}, "sprites": [
                {"name": "a", "rect": {"x": 0, "y": 0, "w": 4, "h": 4}, "originalSize": {"w": 6, "h": 6}},
                {"name": "b", "rect": {"x": 0, "y": 0, "w": 4, "h": 4}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(meta.sprites[0].original_size, Size::new(6, 6));
        assert_eq!(meta.sprites[1].original_size, Size::new(10, 10));

        // hub fallback, then the rect itself
        let text = r#"{"sprites": [{"name": "a", "rect": {"x": 0, "y": 0, "w": 4, "h": 2}, "rotate": true}]}"#;
        let with_hub =
            parse_metadata_str(text, MetadataFormat::Json, Path::new("p.json"), Some(Size::new(5, 5)))
                .unwrap();
        assert_eq!(with_hub.sprites[0].original_size, Size::new(5, 5));
        let bare = parse(text).unwrap();
        assert_eq!(bare.sprites[0].original_size, Size::new(2, 4));
        assert!(!bare.sprites[0].is_trimmed());
    }

    #[test]
    fn test_missing_offset_anchors_bottom_right() {
        let meta = parse(
            r#"{"sprites": [{"name": "a", "rect": {"x": 0, "y": 0, "w": 4, "h": 3},
                "originalSize": {"w": 10, "h": 5}}]}"#,
        )
        .unwrap();
        assert_eq!(meta.sprites[0].trim_offset, Offset::new(6, 2));
    }

    #[test]
    fn test_parse_json5() {
        let text = r#"{
            // trailing commas and comments are fine here
            atlas: 'pack1',
            sprites: [
                {name: 'a', rect: {x: 0, y: 0, w: 2, h: 2}, rotate: true,},
            ],
        }"#;
        let meta =
            parse_metadata_str(text, MetadataFormat::Json5, Path::new("pack1.json5"), None).unwrap();
        assert_eq!(meta.atlas, "pack1");
        assert!(meta.sprites[0].rotated);
    }

    #[test]
    fn test_load_metadata_unknown_extension() {
        let err = load_metadata(Path::new("meta.txt"), None).unwrap_err();
        assert!(matches!(err, MetadataError::Unsupported { .. }));
    }

    #[test]
    fn test_load_metadata_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_metadata(&temp.path().join("gone.json"), None).unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }

    #[test]
    fn test_atlas_image_path() {
        let dir = Path::new("tex");
        assert_eq!(atlas_image_path(dir, "pack0"), PathBuf::from("tex/pack0.png"));
        assert_eq!(atlas_image_path(dir, "pack0.png"), PathBuf::from("tex/pack0.png"));
    }

    #[test]
    fn test_resolve_atlas() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pack0.png"), b"png").unwrap();

        let mut meta = parse(r#"{"sprites": [{"name": "a", "rect": {"x": 0, "y": 0, "w": 1, "h": 1}}]}"#)
            .unwrap();
        let resolved = resolve_atlas(&meta, temp.path()).unwrap();
        assert_eq!(resolved.image, temp.path().join("pack0.png"));
        assert!(resolved.alpha.is_none());

        meta.alpha = Some("pack0_alpha".to_string());
        let err = resolve_atlas(&meta, temp.path()).unwrap_err();
        assert!(err.is_missing_atlas());

        meta.atlas = "nope".to_string();
        let err = resolve_atlas(&meta, temp.path()).unwrap_err();
        assert!(err.is_missing_atlas());
        assert!(err.to_string().contains("nope.png"));
    }
}
