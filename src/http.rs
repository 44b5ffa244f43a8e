//! HTTP client construction and image downloads with exponential backoff.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the pipeline can be driven by
//! in-memory stubs in tests:
//! - [`Download`]: Core trait that fetches a URL into a local file
//! - [`ReqwestDownloader`]: Streams the response body to disk with `reqwest`
//! - [`RetryDownload`]: Decorator that adds retry logic to any `Download` implementation
//!
//! # Retry Strategy
//!
//! - Configurable number of retries after the first attempt
//! - Exponential backoff starting at 500ms
//! - Maximum delay capped at 10 seconds
//! - Random jitter (0-250ms) added between attempts

use crate::config::ArchiveConfig;
use crate::error::ArchiveError;
use futures::StreamExt;
use rand::{Rng, rng};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Errors from a single image download. Never fatal to the run.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(StatusCode),
    #[error("failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build the HTTP client shared by the article fetcher and image downloads.
pub fn build_client(config: &ArchiveConfig) -> Result<Client, ArchiveError> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .connect_timeout(config.timeout)
        .build()?;
    Ok(client)
}

/// Trait for fetching a remote resource into a local file.
pub trait Download {
    /// Download `url` to `destination`, returning the number of bytes written.
    ///
    /// Implementations must not leave a file at `destination` when they fail.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError>;
}

/// Streams response bodies to disk.
///
/// The body is written to `<destination>.part` and renamed once complete,
/// so an interrupted transfer never looks like an existing image.
#[derive(Debug, Clone)]
pub struct ReqwestDownloader {
    client: Client,
}

impl ReqwestDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

impl Download for ReqwestDownloader {
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status));
        }

        let part = partial_path(destination);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| DownloadError::Io { path, source }
        };

        let mut file = fs::File::create(&part).await.map_err(io_err(&part))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&part).await;
                    return Err(e.into());
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = fs::remove_file(&part).await;
                return Err(io_err(&part)(e));
            }
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_err(&part))?;
        drop(file);
        fs::rename(&part, destination)
            .await
            .map_err(io_err(destination))?;

        debug!(bytes = written, path = %destination.display(), "Image written");
        Ok(written)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Download`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryDownload<T> {
    /// The underlying downloader to wrap.
    inner: T,
    /// Maximum number of retry attempts after the first failure.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: Duration,
}

impl<T> RetryDownload<T>
where
    T: Download,
{
    /// Create a new retry wrapper around an existing [`Download`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let downloader = RetryDownload::new(ReqwestDownloader::new(client), 2, Duration::from_millis(500));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl<T> fmt::Debug for RetryDownload<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryDownload")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Download for RetryDownload<T>
where
    T: Download,
{
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.download(url, destination).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }

                    let mut delay = self
                        .base_delay
                        .saturating_mul(1u32 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %e,
                        "download attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
