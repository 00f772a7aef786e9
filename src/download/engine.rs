//! Download engine: bounded concurrent fetching with retry and skip-if-present.
//!
//! The engine spawns one Tokio task per URL. A task first checks whether the
//! file already exists somewhere under the destination tree; if so it reports
//! [`OutcomeStatus::Skipped`] without touching the network or the semaphore.
//! Otherwise it waits for one of `K` semaphore permits, runs the retry loop,
//! sleeps a short cooldown and only then releases the permit.
//!
//! [`DownloadEngine::process`] resolves once every task is terminal, so its
//! return is the point after which the destination tree may be reorganized.
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
//! println!("ok: {}, skipped: {}, failed: {}", summary.succeeded(), summary.skipped(), summary.failed());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use super::item::{DownloadItem, DownloadOutcome, OutcomeStatus};
use super::resume::find_existing_async;
use super::retry::{RetryDecision, RetryPolicy};
use super::{DownloadError, HttpClient};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency: two requests in flight at a time.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Error type for download engine operations.
///
/// None of these come from individual items; a failing item only ever
/// produces a [`OutcomeStatus::Failed`] outcome.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The destination root could not be created.
    #[error("cannot create destination directory {path}: {source}")]
    CreateDestination {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Progress events emitted while a batch runs.
///
/// Purely informational; nothing in the engine depends on a receiver existing.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Items were built and are about to be spawned. URLs without a usable file name
    /// are not counted; they never produce a `Finished` event.
    Dispatched {
        /// Number of tasks that will each emit exactly one `Finished`.
        items: usize,
    },
    /// A task acquired its permit and is about to make its first request.
    Started {
        /// URL being fetched.
        url: String,
    },
    /// An attempt failed and another one will follow.
    Retrying {
        /// URL being fetched.
        url: String,
        /// The attempt about to be made (2 for the first retry).
        attempt: u32,
        /// Display form of the error that triggered the retry.
        error: String,
    },
    /// A task reached its terminal state.
    Finished(DownloadOutcome),
}

/// Result of a finished batch.
///
/// Outcomes are in the same order as the input URLs (minus any URL that
/// could not be turned into a [`DownloadItem`], see [`rejected`](Self::rejected)).
#[derive(Debug, Default)]
pub struct DownloadSummary {
    outcomes: Vec<DownloadOutcome>,
    rejected: Vec<String>,
    retried: usize,
}

impl DownloadSummary {
    /// All outcomes, one per dispatched item.
    #[must_use]
    pub fn outcomes(&self) -> &[DownloadOutcome] {
        &self.outcomes
    }

    /// Consumes the summary, returning the outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<DownloadOutcome> {
        self.outcomes
    }

    /// URLs that were not dispatched because no file name could be derived.
    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Number of items fetched in this run.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Success)
    }

    /// Number of items skipped because the file was already present.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    /// Number of items that exhausted their attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    /// Total number of outcomes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of retry attempts made across all items.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Coordinator for a batch of image downloads.
///
/// # Concurrency Model
///
/// - Each item runs in its own Tokio task
/// - A semaphore permit is required before any network request
/// - The permit is held through retries and the cooldown, and released on
///   every exit path (RAII)
/// - Tasks share nothing but the semaphore and the cloned [`HttpClient`]
#[derive(Debug)]
pub struct DownloadEngine {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    retry_policy: RetryPolicy,
    events: Option<UnboundedSender<DownloadEvent>>,
}

impl DownloadEngine {
    /// Creates an engine with the given concurrency limit and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    #[instrument(level = "debug", skip(retry_policy))]
    pub fn new(concurrency: usize, retry_policy: RetryPolicy) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            retry_delay_ms = retry_policy.retry_delay().as_millis(),
            "creating download engine"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            retry_policy,
            events: None,
        })
    }

    /// Attaches a channel that receives [`DownloadEvent`]s.
    #[must_use]
    pub fn with_events(mut self, sender: UnboundedSender<DownloadEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Downloads every URL into `destination_root` and waits for all of them.
    ///
    /// `urls` must already be deduplicated. The root is created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CreateDestination`] if the root cannot be
    /// created; no task is started in that case.
    ///
    /// Individual download failures do NOT cause this method to error.
    #[instrument(skip(self, urls, client), fields(root = %destination_root.display(), count = urls.len()))]
    pub async fn process(
        &self,
        urls: &[String],
        client: &HttpClient,
        destination_root: &Path,
    ) -> Result<DownloadSummary, EngineError> {
        tokio::fs::create_dir_all(destination_root)
            .await
            .map_err(|source| EngineError::CreateDestination {
                path: destination_root.to_path_buf(),
                source,
            })?;

        let retried = Arc::new(AtomicUsize::new(0));
        let mut rejected = Vec::new();
        let mut items = Vec::with_capacity(urls.len());

        info!("starting downloads");

        for url in urls {
            match DownloadItem::from_url(url, destination_root) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(url = %url, error = %e, "cannot derive a file name, not downloading");
                    rejected.push(url.clone());
                }
            }
        }

        emit(
            self.events.as_ref(),
            DownloadEvent::Dispatched { items: items.len() },
        );

        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let task = ItemTask {
                item: item.clone(),
                root: destination_root.to_path_buf(),
                client: client.clone(),
                semaphore: Arc::clone(&self.semaphore),
                policy: self.retry_policy.clone(),
                events: self.events.clone(),
                retried: Arc::clone(&retried),
            };
            handles.push((item, tokio::spawn(task.run())));
        }

        debug!(task_count = handles.len(), "waiting for downloads to complete");

        let mut outcomes = Vec::with_capacity(handles.len());
        for (item, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(url = %item.url(), error = %e, "download task panicked");
                    let outcome = DownloadOutcome::failed(
                        item,
                        self.retry_policy.max_attempts(),
                        format!("task panicked: {e}"),
                    );
                    emit(self.events.as_ref(), DownloadEvent::Finished(outcome.clone()));
                    outcomes.push(outcome);
                }
            }
        }

        let summary = DownloadSummary {
            outcomes,
            rejected,
            retried: retried.load(Ordering::SeqCst),
        };

        info!(
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            retried = summary.retried(),
            total = summary.total(),
            "downloads complete"
        );

        Ok(summary)
    }
}

/// Everything one spawned task owns.
struct ItemTask {
    item: DownloadItem,
    root: PathBuf,
    client: HttpClient,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
    events: Option<UnboundedSender<DownloadEvent>>,
    retried: Arc<AtomicUsize>,
}

impl ItemTask {
    async fn run(self) -> DownloadOutcome {
        let outcome = self.execute().await;
        emit(self.events.as_ref(), DownloadEvent::Finished(outcome.clone()));
        outcome
    }

    async fn execute(&self) -> DownloadOutcome {
        let item = self.item.clone();

        if let Some(existing) =
            find_existing_async(self.root.clone(), item.filename().to_string()).await
        {
            info!(
                filename = %item.filename(),
                existing = %existing.display(),
                "already downloaded, skipping"
            );
            return DownloadOutcome::skipped(item);
        }

        // Never closed while the engine is alive.
        let Ok(_permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
            warn!(url = %item.url(), "concurrency semaphore closed");
            return DownloadOutcome::failed(
                item,
                self.policy.max_attempts(),
                "concurrency semaphore closed",
            );
        };

        emit(
            self.events.as_ref(),
            DownloadEvent::Started {
                url: item.url().to_string(),
            },
        );

        let outcome = match self.download_with_retry().await {
            Ok(attempts) => {
                info!(url = %item.url(), attempts, "downloaded");
                DownloadOutcome::success(item, attempts)
            }
            Err((e, attempts)) => {
                warn!(
                    url = %item.url(),
                    error = %e,
                    attempts,
                    "download failed after all attempts"
                );
                DownloadOutcome::failed(item, attempts, e.to_string())
            }
        };

        let cooldown = self.policy.cooldown();
        debug!(cooldown_ms = cooldown.as_millis(), "cooling down before releasing slot");
        tokio::time::sleep(cooldown).await;

        outcome
    }

    /// Runs attempts until one succeeds or the policy gives up.
    ///
    /// Returns the number of attempts used, or the last error with the
    /// attempt count when exhausted.
    #[instrument(skip(self), fields(url = %self.item.url()))]
    async fn download_with_retry(&self) -> Result<u32, (DownloadError, u32)> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "attempting download");

            match self
                .client
                .download_to_path(self.item.url(), self.item.destination_path())
                .await
            {
                Ok(_) => return Ok(attempt),
                Err(e) => match self.policy.should_retry(attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        info!(
                            url = %self.item.url(),
                            attempt = next_attempt,
                            max_attempts = self.policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "retrying download"
                        );
                        emit(
                            self.events.as_ref(),
                            DownloadEvent::Retrying {
                                url: self.item.url().to_string(),
                                attempt: next_attempt,
                                error: e.to_string(),
                            },
                        );
                        self.retried.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp => return Err((e, attempt)),
                },
            }
        }
    }
}

fn emit(events: Option<&UnboundedSender<DownloadEvent>>, event: DownloadEvent) {
    if let Some(sender) = events {
        // A dropped receiver only means nobody is watching progress.
        let _ = sender.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO).with_cooldown(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_engine_new_valid_concurrency() {
        let engine = DownloadEngine::new(1, RetryPolicy::default()).unwrap();
        assert_eq!(engine.concurrency(), 1);

        let engine = DownloadEngine::new(DEFAULT_CONCURRENCY, RetryPolicy::default()).unwrap();
        assert_eq!(engine.concurrency(), 2);

        let engine = DownloadEngine::new(100, RetryPolicy::default()).unwrap();
        assert_eq!(engine.concurrency(), 100);
    }

    #[test]
    fn test_engine_new_invalid_concurrency() {
        assert!(matches!(
            DownloadEngine::new(0, RetryPolicy::default()),
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            DownloadEngine::new(101, RetryPolicy::default()),
            Err(EngineError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_engine_stores_retry_policy() {
        let engine = DownloadEngine::new(2, RetryPolicy::with_max_attempts(5)).unwrap();
        assert_eq!(engine.retry_policy().max_attempts(), 5);
    }

    #[test]
    fn test_engine_error_display() {
        let msg = EngineError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_summary_counts() {
        let root = Path::new("out");
        let a = DownloadItem::from_url("http://x/a.png", root).unwrap();
        let b = DownloadItem::from_url("http://x/b.png", root).unwrap();
        let c = DownloadItem::from_url("http://x/c.png", root).unwrap();
        let summary = DownloadSummary {
            outcomes: vec![
                DownloadOutcome::success(a, 1),
                DownloadOutcome::skipped(b),
                DownloadOutcome::failed(c, 3, "HTTP 500"),
            ],
            rejected: Vec::new(),
            retried: 2,
        };
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.retried(), 2);
    }

    #[tokio::test]
    async fn test_process_empty_input_creates_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("DownloadedImages");
        let engine = DownloadEngine::new(2, quick_policy()).unwrap();
        let client = HttpClient::new().unwrap();

        let summary = engine.process(&[], &client, &root).await.unwrap();

        assert_eq!(summary.total(), 0);
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_process_skips_existing_without_network() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.png"), b"cached").unwrap();
        let engine = DownloadEngine::new(1, quick_policy()).unwrap();
        let client = HttpClient::new().unwrap();

        // Unroutable host: a network attempt would fail, not skip.
        let urls = vec!["http://invalid.invalid/a.png".to_string()];
        let summary = engine.process(&urls, &client, temp.path()).await.unwrap();

        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.outcomes()[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_process_rejects_url_without_filename() {
        let temp = tempfile::TempDir::new().unwrap();
        let engine = DownloadEngine::new(1, quick_policy()).unwrap();
        let client = HttpClient::new().unwrap();

        let urls = vec!["http://x/dir/".to_string()];
        let summary = engine.process(&urls, &client, temp.path()).await.unwrap();

        assert_eq!(summary.total(), 0);
        assert_eq!(summary.rejected(), ["http://x/dir/".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatched_event_counts_only_real_items() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.png"), b"x").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let engine = DownloadEngine::new(1, quick_policy())
            .unwrap()
            .with_events(tx);
        let client = HttpClient::new().unwrap();

        let urls = vec!["http://x/dir/".to_string(), "http://x/a.png".to_string()];
        engine.process(&urls, &client, temp.path()).await.unwrap();
        drop(engine);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(events[0], DownloadEvent::Dispatched { items: 1 }));
        let finished = events
            .iter()
            .filter(|e| matches!(e, DownloadEvent::Finished(_)))
            .count();
        assert_eq!(finished, 1);
    }

    #[tokio::test]
    async fn test_process_fails_when_root_is_a_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let engine = DownloadEngine::new(1, quick_policy()).unwrap();
        let client = HttpClient::new().unwrap();

        let result = engine
            .process(&["http://x/a.png".to_string()], &client, &file)
            .await;

        assert!(matches!(result, Err(EngineError::CreateDestination { .. })));
    }
}
