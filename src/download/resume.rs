//! Already-downloaded check that makes re-runs idempotent.
//!
//! A file counts as downloaded when any file with the same name exists
//! anywhere under the destination root, including subfolders the classifier
//! moved it into.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Searches `root` recursively for a file named exactly `filename`.
///
/// Unreadable entries are logged and skipped. A missing root yields `None`.
#[must_use]
pub fn find_existing(root: &Path, filename: &str) -> Option<PathBuf> {
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // The root itself not existing is the normal first-run case.
                if err.depth() == 0 {
                    trace!(root = %root.display(), error = %err, "destination root not readable");
                } else {
                    warn!(root = %root.display(), error = %err, "error scanning destination tree");
                }
                continue;
            }
        };

        if entry.file_type().is_file() && entry.file_name() == filename {
            debug!(path = %entry.path().display(), "found existing file");
            return Some(entry.into_path());
        }
    }
    None
}

/// Async wrapper around [`find_existing`] that keeps the walk off the runtime threads.
pub async fn find_existing_async(root: PathBuf, filename: String) -> Option<PathBuf> {
    let fallback_root = root.clone();
    let fallback_name = filename.clone();
    match tokio::task::spawn_blocking(move || find_existing(&root, &filename)).await {
        Ok(found) => found,
        Err(err) => {
            warn!(error = %err, "existing-file scan task failed; scanning inline");
            find_existing(&fallback_root, &fallback_name)
        }
    }
}
