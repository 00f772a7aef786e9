//! Post-download pass that moves square 2048×2048 PNGs into a renders folder.
//!
//! Only the top level of the download directory is scanned, so files already
//! sorted are left alone. A per-file problem is logged and recorded; it never
//! stops the pass.

use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Edge length, in pixels, of the images treated as renders.
pub const RENDER_SIZE: u32 = 2048;

/// Default name of the renders subfolder.
pub const DEFAULT_RENDERS_DIR: &str = "Renders";

/// Errors that stop the classification pass before it looks at any file.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The renders folder could not be created.
    #[error("cannot create renders directory {path}: {source}")]
    CreateRendersDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The renders folder name is not a single plain path component.
    #[error("invalid renders folder name '{name}': expected a plain folder name")]
    InvalidRendersDir {
        /// The rejected name.
        name: String,
    },

    /// The download directory could not be listed.
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        /// Directory that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Returns true when `name` is one plain folder name.
///
/// Empty names, `.`, `..` and anything containing a path separator are
/// rejected so renders always stay inside the download tree.
#[must_use]
pub fn is_valid_renders_dir(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// What the classification pass did.
#[derive(Debug, Default)]
pub struct ClassifyReport {
    /// PNG files looked at.
    pub inspected: usize,
    /// Files moved into the renders folder (new paths).
    pub moved: Vec<PathBuf>,
    /// Renders left in place because the renders folder already had that name.
    pub kept_existing: Vec<PathBuf>,
    /// Files that could not be identified or moved, with the error text.
    pub errors: Vec<(PathBuf, String)>,
}

/// Returns true for a PNG of exactly [`RENDER_SIZE`]×[`RENDER_SIZE`] pixels.
///
/// Only the image header is read.
///
/// # Errors
///
/// Returns the decoder or IO error if the header cannot be read.
pub fn is_render(path: &Path) -> Result<bool, image::ImageError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if reader.format() != Some(ImageFormat::Png) {
        return Ok(false);
    }
    let (width, height) = reader.into_dimensions()?;
    Ok(width == RENDER_SIZE && height == RENDER_SIZE)
}

/// Moves every render directly under `root` into `root/<renders_dir>`.
///
/// # Errors
///
/// Returns [`ClassifyError`] if `renders_dir` is not a plain folder name,
/// the renders folder cannot be created or `root` cannot be listed.
/// Per-file failures are collected in the report.
#[instrument(skip(root), fields(root = %root.display()))]
pub fn classify_renders(root: &Path, renders_dir: &str) -> Result<ClassifyReport, ClassifyError> {
    if !is_valid_renders_dir(renders_dir) {
        return Err(ClassifyError::InvalidRendersDir {
            name: renders_dir.to_string(),
        });
    }
    let renders = root.join(renders_dir);
    std::fs::create_dir_all(&renders).map_err(|source| ClassifyError::CreateRendersDir {
        path: renders.clone(),
        source,
    })?;

    let entries = std::fs::read_dir(root).map_err(|source| ClassifyError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut report = ClassifyReport::default();

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(error = %e, "error listing download directory");
                report.errors.push((root.to_path_buf(), e.to_string()));
                continue;
            }
        };
        if !path.is_file() || !has_png_extension(&path) {
            continue;
        }
        report.inspected += 1;

        match is_render(&path) {
            Ok(true) => {}
            Ok(false) => {
                debug!(path = %path.display(), "not a render");
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "error processing image");
                report.errors.push((path, e.to_string()));
                continue;
            }
        }

        let Some(name) = path.file_name() else {
            continue;
        };
        let destination = renders.join(name);
        if destination.exists() {
            debug!(path = %path.display(), "render already present in renders folder");
            report.kept_existing.push(path);
            continue;
        }

        match std::fs::rename(&path, &destination) {
            Ok(()) => {
                info!(file = %name.to_string_lossy(), renders = %renders_dir, "moved render");
                report.moved.push(destination);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "error moving render");
                report.errors.push((path, e.to_string()));
            }
        }
    }

    info!(
        inspected = report.inspected,
        moved = report.moved.len(),
        kept = report.kept_existing.len(),
        errors = report.errors.len(),
        "classification complete"
    );

    Ok(report)
}

fn has_png_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}
