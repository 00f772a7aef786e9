//! Bounded-concurrency image download pipeline.
//!
//! # Features
//!
//! - At most `K` requests in flight (semaphore permits)
//! - Fixed-count, fixed-delay retry for every kind of failure
//! - Skip-if-present check across the whole destination tree, so re-runs are cheap
//! - Streaming writes with partial-file cleanup
//! - Optional progress event channel
//!
//! # Example
//!
//! ```no_run
//! use librarycache_core::download::{DownloadEngine, HttpClient, RetryPolicy};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(2, RetryPolicy::default())?;
//! let client = HttpClient::new()?;
//! let urls = vec!["https://img.rec.net/a.png".to_string()];
//! let summary = engine.process(&urls, &client, Path::new("DownloadedImages")).await?;
//! assert_eq!(summary.total(), 1);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod item;
pub mod resume;
mod retry;

pub use client::HttpClient;
pub use engine::{DEFAULT_CONCURRENCY, DownloadEngine, DownloadEvent, DownloadSummary, EngineError};
pub use error::DownloadError;
pub use item::{DownloadItem, DownloadOutcome, OutcomeStatus};
pub use resume::find_existing;
pub use retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryDecision, RetryPolicy};
