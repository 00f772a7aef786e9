//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use librarycache_core::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_RENDERS_DIR, is_valid_renders_dir,
};

/// Default download directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "DownloadedImages";

/// Default link report path.
pub const DEFAULT_REPORT_PATH: &str = "output.txt";

/// Default delay between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Fetch the images referenced by a Rec Room Library cache file.
///
/// Scans the Library file for PNG/JPEG links, writes them to a report,
/// downloads every image not already on disk and moves 2048x2048 renders
/// into their own folder.
#[derive(Parser, Debug, Clone)]
#[command(name = "librarycache")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the Library file (defaults to the game's LocalLow location)
    #[arg(value_name = "LIBRARY")]
    pub library: Option<PathBuf>,

    /// Directory to download images into
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Attempts per image before giving up (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Delay between attempts in milliseconds (0-60000)
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay: u64,

    /// File to write the grouped link report to
    #[arg(long, default_value = DEFAULT_REPORT_PATH)]
    pub report: PathBuf,

    /// Name of the folder (inside the output directory) that receives renders
    #[arg(long, default_value = DEFAULT_RENDERS_DIR, value_parser = parse_renders_dir)]
    pub renders_dir: String,

    /// Skip moving 2048x2048 renders after downloading
    #[arg(long)]
    pub no_classify: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Accepts a single folder name; anything that could point outside the
/// output directory is refused.
fn parse_renders_dir(value: &str) -> Result<String, String> {
    if is_valid_renders_dir(value) {
        Ok(value.to_string())
    } else {
        Err("expected a plain folder name (no '/', '\\', '.' or '..')".to_string())
    }
}
