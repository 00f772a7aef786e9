//! Library cache image fetcher.
//!
//! Reads a Rec Room `Library` cache file, pulls out every PNG/JPEG URL it
//! references, downloads them with bounded concurrency and sorts the
//! 2048×2048 renders into their own folder.
//!
//! # Architecture
//!
//! - [`library`] - Locating and reading the Library file
//! - [`parser`] - URL extraction and case-insensitive dedup
//! - [`report`] - Grouped link report (`output.txt`)
//! - [`download`] - Bounded concurrent download engine with retry and skip-if-present
//! - [`classify`] - Moves renders into the `Renders` folder after downloads settle

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod download;
pub mod library;
pub mod parser;
pub mod report;

// Re-export commonly used types
pub use classify::{
    ClassifyError, ClassifyReport, DEFAULT_RENDERS_DIR, classify_renders, is_valid_renders_dir,
};
pub use download::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, DownloadEngine,
    DownloadError, DownloadEvent, DownloadItem, DownloadOutcome, DownloadSummary, EngineError,
    HttpClient, OutcomeStatus, RetryPolicy,
};
pub use library::{LibraryError, default_library_path, locate_library, read_library};
pub use parser::{ParseResult, parse_library};
pub use report::write_report_file;
