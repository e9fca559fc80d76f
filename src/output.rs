//! Image encoding and output file naming

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Default lossy WebP quality (0-100).
pub const DEFAULT_WEBP_QUALITY: f32 = 90.0;

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error while writing the file
    Io { path: PathBuf, source: io::Error },
    /// Encoder rejected the image
    Encode { format: OutputFormat, message: String },
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            OutputError::Encode { format, message } => {
                write!(f, "{} encoding failed: {}", format, message)
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io { source, .. } => Some(source),
            OutputError::Encode { .. } => None,
        }
    }
}

/// Output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// Lossy WebP
    Webp,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Parse a format name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encodes sprites and writes them under an output directory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputWriter {
    pub format: OutputFormat,
    pub webp_quality: f32,
}

impl Default for OutputWriter {
    fn default() -> Self {
        Self::new(OutputFormat::Png)
    }
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, webp_quality: DEFAULT_WEBP_QUALITY }
    }

    /// Set the lossy WebP quality, clamped to 0-100.
    pub fn with_webp_quality(mut self, quality: f32) -> Self {
        self.webp_quality = quality.clamp(0.0, 100.0);
        self
    }

    /// Encode `image` into the configured format.
    pub fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, OutputError> {
        match self.format {
            OutputFormat::Png => encode_png(image),
            OutputFormat::Webp => encode_webp(image, self.webp_quality),
        }
    }

    /// Encode `image` and write it to `<dir>/<name>.<ext>`.
    ///
    /// The directory is created if missing and an existing file is
    /// overwritten. Returns the written path.
    pub fn save(&self, image: &RgbaImage, dir: &Path, name: &str) -> Result<PathBuf, OutputError> {
        let bytes = self.encode(image)?;
        let path = output_path(dir, name, self.format);

        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .map_err(|source| OutputError::Io { path: dir.to_path_buf(), source })?;
        }
        std::fs::write(&path, bytes).map_err(|source| OutputError::Io { path: path.clone(), source })?;
        Ok(path)
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, OutputError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| OutputError::Encode { format: OutputFormat::Png, message: e.to_string() })?;
    Ok(buf)
}

fn encode_webp(image: &RgbaImage, quality: f32) -> Result<Vec<u8>, OutputError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OutputError::Encode {
            format: OutputFormat::Webp,
            message: "image has zero area".to_string(),
        });
    }
    let encoder = webp::Encoder::from_rgba(image.as_raw(), image.width(), image.height());
    let memory = encoder
        .encode_simple(false, quality)
        .map_err(|e| OutputError::Encode { format: OutputFormat::Webp, message: format!("{:?}", e) })?;
    Ok(memory.to_vec())
}

/// Make a sprite name safe to use as a single file name.
///
/// Path separators and control characters become `_`; names that would
/// resolve to the directory itself or its parent are prefixed.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}

/// Path a sprite named `name` is written to.
pub fn output_path(dir: &Path, name: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_name(name), format.extension()))
}
