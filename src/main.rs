//! CLI entry point for the Library image fetcher.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use librarycache_core::{
    DownloadEngine, HttpClient, RetryPolicy, classify_renders, default_library_path,
    locate_library, parse_library, read_library, write_report_file,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod progress;

use cli::Args;

const COMPLETION_MESSAGE: &str = "Finished downloading/moving everything!";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let (args, sources) = config::parse_cli_with_sources();

    // Config errors are reported after tracing is up, so load the file first
    // only to learn its verbosity default.
    let loaded_config = config::load_default_file_config();
    let file_config = loaded_config.as_ref().ok().and_then(Option::as_ref);
    let args = config::apply_config_defaults(args, &sources, file_config.map(|(_, cfg)| cfg));

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some((path, _)) = loaded_config.context("Failed to load configuration file")? {
        debug!(path = %path.display(), "loaded config file");
    }
    debug!(?args, "CLI arguments parsed");

    run(args).await?;

    println!("{COMPLETION_MESSAGE}");
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let library_path = resolve_library_path(args.library.clone())?;
    let bytes = read_library(&library_path)?;

    let parsed = parse_library(&bytes);
    info!(
        links = parsed.len(),
        duplicates = parsed.duplicates,
        invalid = parsed.invalid.len(),
        "parsed library"
    );

    if let Err(error) = write_report_file(&args.report, &parsed.links) {
        warn!(path = %args.report.display(), %error, "failed to write link report");
    }

    let client = HttpClient::new().context("Failed to build HTTP client")?;
    let retry_policy = RetryPolicy::new(
        u32::from(args.max_attempts),
        Duration::from_millis(args.retry_delay),
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let engine = DownloadEngine::new(usize::from(args.concurrency), retry_policy)?
        .with_events(events_tx);
    let progress = progress::spawn_progress_ui(!args.quiet, events_rx);

    let summary = engine
        .process(&parsed.links, &client, &args.output_dir)
        .await?;

    // The bar task exits once the engine's sender is gone.
    drop(engine);
    if let Err(error) = progress.await {
        debug!(%error, "progress task ended abnormally");
    }

    info!(
        succeeded = summary.succeeded(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        retried = summary.retried(),
        rejected = summary.rejected().len(),
        total = summary.total(),
        "downloads settled"
    );

    if args.no_classify {
        debug!("render classification disabled");
        return Ok(());
    }

    let output_dir = args.output_dir.clone();
    let renders_dir = args.renders_dir.clone();
    let report = tokio::task::spawn_blocking(move || classify_renders(&output_dir, &renders_dir))
        .await
        .context("Render classification task failed")??;

    for (path, error) in &report.errors {
        warn!(path = %path.display(), %error, "could not classify image");
    }
    info!(
        inspected = report.inspected,
        moved = report.moved.len(),
        kept_existing = report.kept_existing.len(),
        "renders classified"
    );

    Ok(())
}

/// CLI/config path, else the platform default; prompts only on an interactive stdin.
fn resolve_library_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let candidate = explicit.or_else(default_library_path);

    let path = if io::stdin().is_terminal() {
        locate_library(candidate, Some((io::stdin().lock(), io::stdout())))
    } else {
        locate_library(candidate, None::<(io::StdinLock<'static>, io::Stdout)>)
    };
    path.context("Failed to locate the Library file")
}
