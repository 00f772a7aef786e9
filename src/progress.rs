//! Progress bar driven by the engine's event stream.

use indicatif::{ProgressBar, ProgressStyle};
use librarycache_core::{DownloadEvent, OutcomeStatus};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use url::Url;

/// Spawns a task that renders `events` until every sender is dropped.
///
/// The bar length comes from the engine's `Dispatched` event. When `visible`
/// is false the events are drained without drawing anything.
pub(crate) fn spawn_progress_ui(
    visible: bool,
    mut events: UnboundedReceiver<DownloadEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut failed = 0usize;
        while let Some(event) = events.recv().await {
            match event {
                DownloadEvent::Dispatched { items } => bar.set_length(items as u64),
                DownloadEvent::Started { url } => {
                    bar.set_message(format!("Downloading from {}...", host_of(&url)));
                }
                DownloadEvent::Retrying { url, attempt, .. } => {
                    bar.set_message(format!("Retrying {} (attempt {attempt})", host_of(&url)));
                }
                DownloadEvent::Finished(outcome) => {
                    if outcome.status == OutcomeStatus::Failed {
                        failed += 1;
                    }
                    bar.inc(1);
                }
            }
        }

        if failed == 0 {
            bar.finish_and_clear();
        } else {
            bar.abandon_with_message(format!("{failed} failed"));
        }
    })
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "library".to_string())
}
