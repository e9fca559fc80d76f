//! Atlas image loading
//!
//! Decodes an atlas into RGBA. Atlases exported from the game keep their
//! transparency in a separate greyscale mask; when one is present it is
//! merged into the alpha channel, resampled first if the mask was stored
//! at a different resolution.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metadata::ResolvedAtlas;

/// Error decoding an atlas or its alpha mask. Skips the whole pair.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to decode atlas {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn open(path: &Path) -> Result<DynamicImage, AtlasError> {
    image::open(path).map_err(|source| AtlasError::Decode { path: path.to_path_buf(), source })
}

/// Decode the atlas named by `resolved`, merging its alpha mask if any.
pub fn load_atlas(resolved: &ResolvedAtlas) -> Result<RgbaImage, AtlasError> {
    let mut atlas = open(&resolved.image)?.to_rgba8();
    if let Some(alpha_path) = &resolved.alpha {
        let mask = open(alpha_path)?.to_luma8();
        apply_alpha_mask(&mut atlas, &mask);
    }
    Ok(atlas)
}

/// Replace the alpha channel of `atlas` with `mask`.
///
/// A mask of a different size is resampled to the atlas size with a
/// bicubic (Catmull-Rom) filter.
pub fn apply_alpha_mask(atlas: &mut RgbaImage, mask: &GrayImage) {
    let (w, h) = atlas.dimensions();
    let resized;
    let mask = if mask.dimensions() == (w, h) {
        mask
    } else {
        resized = image::imageops::resize(mask, w, h, FilterType::CatmullRom);
        &resized
    };

    for (pixel, alpha) in atlas.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = alpha.0[0];
    }
}
