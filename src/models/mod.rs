//! Data models shared by the metadata parser, extractor and orchestrator

mod sprite;

pub use sprite::{Offset, Origin, Rect, Size, SpriteDescriptor};
