//! Sprite descriptor types.

use serde::{Deserialize, Serialize};

/// A rectangle in atlas pixel space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Right edge (exclusive), widened so it cannot overflow.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.w as u64
    }

    /// Bottom edge (exclusive), widened so it cannot overflow.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.h as u64
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

/// Width and height in pixels.
///
/// Accepts both `{ "w": .., "h": .. }` and `{ "width": .., "height": .. }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Size {
    #[serde(alias = "width")]
    pub w: u32,
    #[serde(alias = "height")]
    pub h: u32,
}

impl Size {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Placement of a trimmed sprite inside its untrimmed canvas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

impl Offset {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Where the Y axis of atlas coordinates starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Y grows downwards from the top edge (image convention)
    #[default]
    TopLeft,
    /// Y grows upwards from the bottom edge (texture convention)
    BottomLeft,
}

/// One sprite's location and transform within an atlas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpriteDescriptor {
    /// Unique key; also the output file stem
    pub name: String,
    /// Packed rectangle in the atlas
    pub rect: Rect,
    /// Stored rotated 90° counter-clockwise by the packer
    pub rotated: bool,
    /// Stored mirrored horizontally by the packer
    pub flipped: bool,
    /// Size of the untrimmed sprite
    pub original_size: Size,
    /// Position of the packed pixels inside the untrimmed canvas
    pub trim_offset: Offset,
}

impl SpriteDescriptor {
    /// Create an untrimmed, unrotated descriptor covering `rect`.
    pub fn new(name: impl Into<String>, rect: Rect) -> Self {
        Self {
            name: name.into(),
            rect,
            rotated: false,
            flipped: false,
            original_size: Size::new(rect.w, rect.h),
            trim_offset: Offset::default(),
        }
    }

    pub fn with_rotated(mut self, rotated: bool) -> Self {
        self.rotated = rotated;
        self
    }

    pub fn with_flipped(mut self, flipped: bool) -> Self {
        self.flipped = flipped;
        self
    }

    pub fn with_original_size(mut self, size: Size) -> Self {
        self.original_size = size;
        self
    }

    pub fn with_trim_offset(mut self, offset: Offset) -> Self {
        self.trim_offset = offset;
        self
    }

    /// Size of the packed pixels once rotation has been undone.
    pub fn effective_size(&self) -> Size {
        if self.rotated {
            Size::new(self.rect.h, self.rect.w)
        } else {
            Size::new(self.rect.w, self.rect.h)
        }
    }

    /// Whether the sprite needs re-padding into its untrimmed canvas.
    pub fn is_trimmed(&self) -> bool {
        self.original_size != self.effective_size()
    }

    /// Offset that anchors the packed pixels to the bottom-right corner
    /// of the untrimmed canvas.
    pub fn bottom_right_offset(original_size: Size, effective: Size) -> Offset {
        Offset::new(
            original_size.w.saturating_sub(effective.w),
            original_size.h.saturating_sub(effective.h),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges_do_not_overflow() {
        let rect = Rect::new(u32::MAX, u32::MAX, 10, 10);
        assert_eq!(rect.right(), u32::MAX as u64 + 10);
        assert_eq!(rect.bottom(), u32::MAX as u64 + 10);
    }

    #[test]
    fn test_rect_display() {
        assert_eq!(Rect::new(4, 8, 16, 32).to_string(), "16x32+4+8");
    }

    #[test]
    fn test_size_accepts_both_spellings() {
        let short: Size = serde_json::from_str(r#"{"w": 3, "h": 4}"#).unwrap();
        let long: Size = serde_json::from_str(r#"{"width": 3, "height": 4}"#).unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_origin_kebab_case() {
        let origin: Origin = serde_json::from_str(r#""bottom-left""#).unwrap();
        assert_eq!(origin, Origin::BottomLeft);
    }

    #[test]
    fn test_effective_size_swaps_when_rotated() {
        let sprite = SpriteDescriptor::new("a", Rect::new(0, 0, 10, 20));
        assert_eq!(sprite.effective_size(), Size::new(10, 20));
        assert!(!sprite.is_trimmed());

        let rotated = sprite.with_rotated(true);
        assert_eq!(rotated.effective_size(), Size::new(20, 10));
        // original size still describes the unrotated rect, so it now differs
        assert!(rotated.is_trimmed());
    }

    #[test]
    fn test_bottom_right_offset_saturates() {
        let offset = SpriteDescriptor::bottom_right_offset(Size::new(10, 10), Size::new(4, 12));
        assert_eq!(offset, Offset::new(6, 0));
    }
}
