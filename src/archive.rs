//! Input staging
//!
//! The cropper reads plain directories. A packaged input (`.zip` or `.apk`)
//! is unpacked into a staging directory first, then searched for the
//! directory that holds the metadata and atlas folders.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

/// Conventional folder holding atlas images.
pub const DEFAULT_ATLAS_DIR: &str = "Texture2D";

/// Conventional folder holding sprite metadata.
pub const DEFAULT_METADATA_DIR: &str = "MonoBehaviour";

/// Package extensions that are unpacked before cropping.
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "apk"];

/// Error staging an input path.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read package {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("unsupported input {}: expected a directory, .zip or .apk", .path.display())]
    UnsupportedInput { path: PathBuf },
    #[error("package {} has no {metadata_dir}/ and {atlas_dir}/ directories", .path.display())]
    Layout { path: PathBuf, metadata_dir: String, atlas_dir: String },
}

/// Names of the metadata and atlas folders under an input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirLayout {
    pub metadata_dir: String,
    pub atlas_dir: String,
}

impl Default for DirLayout {
    fn default() -> Self {
        Self {
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
            atlas_dir: DEFAULT_ATLAS_DIR.to_string(),
        }
    }
}

impl DirLayout {
    /// Whether `dir` directly contains both folders.
    fn matches(&self, dir: &Path) -> bool {
        dir.join(&self.metadata_dir).is_dir() && dir.join(&self.atlas_dir).is_dir()
    }
}

/// An input ready for cropping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInput {
    /// Directory containing the metadata and atlas folders
    pub root: PathBuf,
    /// Number of package entries written, 0 for directory inputs
    pub extracted_files: usize,
}

impl StagedInput {
    /// Whether the input came from a package.
    pub fn is_unpacked(&self) -> bool {
        self.extracted_files > 0
    }
}

/// Whether `path` has a package extension.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ARCHIVE_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// Stage `path` using the conventional folder names.
pub fn stage_input(path: &Path, staging_dir: &Path) -> Result<StagedInput, ArchiveError> {
    stage_input_with_layout(path, staging_dir, &DirLayout::default())
}

/// Stage `path`: directories are used in place, packages are unpacked
/// into `staging_dir` and searched for `layout`.
pub fn stage_input_with_layout(
    path: &Path,
    staging_dir: &Path,
    layout: &DirLayout,
) -> Result<StagedInput, ArchiveError> {
    if path.is_dir() {
        return Ok(StagedInput { root: path.to_path_buf(), extracted_files: 0 });
    }
    if !path.is_file() || !is_archive(path) {
        return Err(ArchiveError::UnsupportedInput { path: path.to_path_buf() });
    }

    let extracted_files = unpack(path, staging_dir)?;
    let root = find_layout_root(staging_dir, layout)?.ok_or_else(|| ArchiveError::Layout {
        path: path.to_path_buf(),
        metadata_dir: layout.metadata_dir.clone(),
        atlas_dir: layout.atlas_dir.clone(),
    })?;

    Ok(StagedInput { root, extracted_files })
}

/// Extract every entry of the package at `path` into `dest`.
///
/// Entries whose names would escape `dest` are skipped. Returns the number
/// of files written.
pub fn unpack(path: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let io_err = |p: &Path| {
        let p = p.to_path_buf();
        move |source| ArchiveError::Io { path: p, source }
    };
    let zip_err = |source| ArchiveError::Zip { path: path.to_path_buf(), source };

    let file = fs::File::open(path).map_err(io_err(path))?;
    let mut archive = ZipArchive::new(file).map_err(zip_err)?;
    fs::create_dir_all(dest).map_err(io_err(dest))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_err)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut out = fs::File::create(&target).map_err(io_err(&target))?;
        io::copy(&mut entry, &mut out).map_err(io_err(&target))?;
        written += 1;
    }
    Ok(written)
}

/// Depth-first search below `dir` (inclusive) for the first directory
/// holding both layout folders. Siblings are visited in name order.
pub fn find_layout_root(dir: &Path, layout: &DirLayout) -> Result<Option<PathBuf>, ArchiveError> {
    if layout.matches(dir) {
        return Ok(Some(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| ArchiveError::Io { path: dir.to_path_buf(), source })?;
    let mut children: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();

    for child in children {
        if let Some(found) = find_layout_root(&child, layout)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
