//! Batch cropping
//!
//! Runs the cropper over every atlas/metadata pair of an input folder:
//! - **Discovery**: find metadata documents, parse them, resolve their atlases
//! - **Cropping**: deduplicate sprites and extract them in parallel
//! - **Reporting**: stream progress events and collect a run result
//!
//! # Example
//!
//! ```ignore
//! use portrait_crop::batch::{CropContext, CropPipeline};
//! use portrait_crop::config::load_config;
//!
//! let loaded = load_config(None)?;
//! let context = CropContext::new(loaded.config, loaded.base_dir);
//! let result = CropPipeline::new(context).run()?;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod pipeline;
pub mod progress;
pub mod result;

pub use context::*;
pub use discovery::*;
pub use pipeline::*;
pub use progress::*;
pub use result::*;
