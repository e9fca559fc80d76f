//! Configuration module for portrait cropping
//!
//! Provides types and parsing for the optional `portraits.toml` run
//! configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
