//! HTTP client wrapper for fetching images to disk.
//!
//! One [`HttpClient`] is built per run and cloned into every task; clones
//! share the same connection pool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, PARTIAL_SUFFIX, READ_TIMEOUT_SECS};
use super::error::DownloadError;

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/librarycache";

/// HTTP client for streaming image downloads.
///
/// # Example
///
/// ```no_run
/// use librarycache_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let bytes = client
///     .download_to_path("https://img.rec.net/abc.png", Path::new("DownloadedImages/abc.png"))
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts (30s connect, 5min total).
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn with_timeouts(connect: Duration, total: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect)
            .timeout(total)
            .gzip(true)
            .user_agent(default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` with a GET and streams the body into `path`.
    ///
    /// Any status outside 2xx is an error. The body is written to a sibling
    /// `<name>.part` file that is renamed onto `path` only once fully flushed,
    /// so `path` never holds a truncated image, even if the process is killed
    /// mid-transfer. On error the `.part` file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] for transport failures, timeouts, non-2xx
    /// statuses and write failures.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn download_to_path(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let partial = partial_path(path);
        let file = File::create(&partial)
            .await
            .map_err(|e| DownloadError::io(&partial, e))?;

        let result = match stream_to_file(file, response, url, &partial).await {
            Ok(bytes) => tokio::fs::rename(&partial, path)
                .await
                .map(|()| bytes)
                .map_err(|e| DownloadError::io(path, e)),
            Err(e) => Err(e),
        };
        if result.is_err() {
            debug!(partial = %partial.display(), "removing partial file after error");
            let _ = tokio::fs::remove_file(&partial).await;
        }
        let bytes = result?;

        debug!(bytes, "body written");
        Ok(bytes)
    }
}

/// In-progress name for `path`: the same file name with `.part` appended.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Streams the response body to `file`, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| DownloadError::io(path, e))?;
    Ok(bytes_written)
}

fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("librarycache/{version} (+{PROJECT_UA_URL})")
}
