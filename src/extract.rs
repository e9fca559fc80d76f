//! Sprite extraction
//!
//! Maps a [`SpriteDescriptor`] back to an upright image:
//!
//! 1. slice the packed rectangle out of the atlas (converting bottom-left
//!    coordinates to image rows first)
//! 2. undo the packer's rotation: rotated sprites are stored 90°
//!    counter-clockwise, so they are turned 90° clockwise
//! 3. undo a horizontal flip
//! 4. re-pad trimmed sprites onto a transparent canvas of the untrimmed
//!    size at the trim offset
//!
//! Nothing is resampled; pixels are copied verbatim.

use image::{imageops, Rgba, RgbaImage};
use thiserror::Error;

use crate::models::{Origin, Rect, SpriteDescriptor};

/// Fully transparent pixel used for padding.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Error extracting one sprite. Skips that sprite only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The sprite rectangle reaches outside the atlas
    #[error("sprite '{sprite}' rect {rect} exceeds atlas bounds {}x{}", .atlas_size.0, .atlas_size.1)]
    Bounds { sprite: String, rect: Rect, atlas_size: (u32, u32) },
}

/// Convert `rect` to top-left pixel coordinates, checking it fits the atlas.
///
/// Returns `(left, top)` of the rectangle in image space.
pub fn locate(rect: &Rect, origin: Origin, atlas_size: (u32, u32)) -> Option<(u32, u32)> {
    let (atlas_w, atlas_h) = atlas_size;
    if rect.right() > atlas_w as u64 || rect.bottom() > atlas_h as u64 {
        return None;
    }
    let top = match origin {
        Origin::TopLeft => rect.y,
        // bottom() <= atlas_h was checked above
        Origin::BottomLeft => atlas_h - rect.y - rect.h,
    };
    Some((rect.x, top))
}

/// Slice the packed pixels of `sprite` without any transform.
pub fn slice(
    atlas: &RgbaImage,
    sprite: &SpriteDescriptor,
    origin: Origin,
) -> Result<RgbaImage, ExtractError> {
    let (left, top) = locate(&sprite.rect, origin, atlas.dimensions()).ok_or_else(|| {
        ExtractError::Bounds {
            sprite: sprite.name.clone(),
            rect: sprite.rect,
            atlas_size: atlas.dimensions(),
        }
    })?;
    Ok(imageops::crop_imm(atlas, left, top, sprite.rect.w, sprite.rect.h).to_image())
}

/// Restore the upright orientation of a packed slice.
pub fn restore_orientation(slice: RgbaImage, rotated: bool, flipped: bool) -> RgbaImage {
    let upright = if rotated { imageops::rotate90(&slice) } else { slice };
    if flipped {
        imageops::flip_horizontal(&upright)
    } else {
        upright
    }
}

/// Extract one sprite from an atlas as an upright RGBA image.
///
/// The result always measures `sprite.original_size`. Pixels that fall
/// outside that canvas after applying the trim offset are clipped.
pub fn extract_sprite(
    atlas: &RgbaImage,
    sprite: &SpriteDescriptor,
    origin: Origin,
) -> Result<RgbaImage, ExtractError> {
    let packed = slice(atlas, sprite, origin)?;
    let upright = restore_orientation(packed, sprite.rotated, sprite.flipped);

    let size = sprite.original_size;
    if upright.dimensions() == (size.w, size.h) && sprite.trim_offset.x == 0 && sprite.trim_offset.y == 0
    {
        return Ok(upright);
    }

    let mut canvas = RgbaImage::from_pixel(size.w, size.h, TRANSPARENT);
    if !sprite.rect.is_empty() {
        imageops::replace(
            &mut canvas,
            &upright,
            sprite.trim_offset.x as i64,
            sprite.trim_offset.y as i64,
        );
    }
    Ok(canvas)
}
