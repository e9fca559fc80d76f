//! Portrait cropping - extract character portraits from sprite atlases
//!
//! This library provides functionality to:
//! - Read sprite atlas metadata (JSON / JSON5) and the optional portrait hub
//! - Deduplicate sprite entries so the first occurrence wins
//! - Extract sprites upright at their untrimmed size (un-rotate, un-flip, re-pad)
//! - Crop many atlases in parallel and write PNG or WebP portraits

pub mod archive;
pub mod atlas;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod extract;
pub mod hub;
pub mod metadata;
pub mod models;
pub mod output;
