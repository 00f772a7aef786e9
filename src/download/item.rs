//! Download items and their terminal outcomes.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use super::DownloadError;

/// One image to fetch. Immutable once built; owned by exactly one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    url: String,
    filename: String,
    destination_path: PathBuf,
}

impl DownloadItem {
    /// Builds an item from a URL, deriving the file name from the last path segment.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] if the URL does not parse or its
    /// path has no non-empty last segment.
    pub fn from_url(url: &str, destination_root: &Path) -> Result<Self, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let filename = filename_from_url(&parsed).ok_or_else(|| DownloadError::invalid_url(url))?;
        let destination_path = destination_root.join(&filename);

        Ok(Self {
            url: url.to_string(),
            filename,
            destination_path,
        })
    }

    /// The source URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// File name derived from the URL path.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Where the bytes are written.
    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }
}

/// Terminal state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// Bytes fetched and fully written.
    Success,
    /// A file with the same name already exists under the destination tree.
    Skipped,
    /// Every attempt failed.
    Failed,
}

impl OutcomeStatus {
    /// Stable lowercase label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one [`DownloadItem`].
///
/// `attempts` is 0 for `Skipped`, between 1 and `max_attempts` for `Success`,
/// and equal to `max_attempts` for `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// The item this outcome belongs to.
    pub item: DownloadItem,
    /// Terminal status.
    pub status: OutcomeStatus,
    /// Network attempts made.
    pub attempts: u32,
    /// Display form of the last error, for failed items.
    pub last_error: Option<String>,
}

impl DownloadOutcome {
    pub(crate) fn success(item: DownloadItem, attempts: u32) -> Self {
        Self {
            item,
            status: OutcomeStatus::Success,
            attempts,
            last_error: None,
        }
    }

    pub(crate) fn skipped(item: DownloadItem) -> Self {
        Self {
            item,
            status: OutcomeStatus::Skipped,
            attempts: 0,
            last_error: None,
        }
    }

    pub(crate) fn failed(item: DownloadItem, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            item,
            status: OutcomeStatus::Failed,
            attempts,
            last_error: Some(error.into()),
        }
    }
}

/// Last non-empty path segment, with path-hostile characters replaced.
fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    Some(sanitize_filename(last))
}

fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized == "." || sanitized == ".." {
        return sanitized.replace('.', "_");
    }
    sanitized
}
