//! Image downloads for archived articles.
//!
//! Each destination path is claimed once per run before anything touches
//! the filesystem, so concurrent workers never fetch the same file twice.
//! With `skip_existing` set, a file already present on disk counts as
//! downloaded; its content is not checked.

use crate::http::Download;
use crate::models::{ImageReference, ImageReport};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageStatus {
    Downloaded,
    SkippedExisting,
    AlreadyClaimed,
    Failed,
}

/// Downloads images into images directories, at most once per file per run.
#[derive(Debug)]
pub struct ImageStore<D> {
    downloader: D,
    skip_existing: bool,
    concurrency: usize,
    claimed: Mutex<HashSet<PathBuf>>,
}

impl<D: Download> ImageStore<D> {
    pub fn new(downloader: D, skip_existing: bool, concurrency: usize) -> Self {
        Self {
            downloader,
            skip_existing,
            concurrency: concurrency.max(1),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Record `path` as handled in this run. Returns `false` if it already was.
    fn claim(&self, path: &Path) -> bool {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        claimed.insert(path.to_path_buf())
    }

    /// Download every image into `images_dir`.
    ///
    /// Failures are logged and counted; they never cancel sibling downloads.
    /// `found` and `filtered` in the returned report are left at zero for the
    /// caller to fill in.
    #[instrument(level = "info", skip_all, fields(images_dir = %images_dir.display(), count = images.len()))]
    pub async fn download_all(&self, images: &[ImageReference], images_dir: &Path) -> ImageReport {
        let statuses: Vec<ImageStatus> = stream::iter(images)
            .map(|image| self.download_one(image, images_dir))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = ImageReport::default();
        for status in statuses {
            match status {
                ImageStatus::Downloaded => report.downloaded += 1,
                ImageStatus::SkippedExisting => report.skipped_existing += 1,
                ImageStatus::AlreadyClaimed => report.reused += 1,
                ImageStatus::Failed => report.failed += 1,
            }
        }
        report
    }

    async fn download_one(&self, image: &ImageReference, images_dir: &Path) -> ImageStatus {
        let destination = images_dir.join(&image.local_file_name);

        if !self.claim(&destination) {
            info!(file = %image.local_file_name, "Image already handled in this run");
            return ImageStatus::AlreadyClaimed;
        }

        if self.skip_existing && tokio::fs::try_exists(&destination).await.unwrap_or(false) {
            info!(file = %image.local_file_name, "Image exists; skipping download");
            return ImageStatus::SkippedExisting;
        }

        info!(file = %image.local_file_name, url = %image.original_url, "Downloading image");
        match self
            .downloader
            .download(&image.original_url, &destination)
            .await
        {
            Ok(bytes) => {
                info!(file = %image.local_file_name, bytes, "Downloaded image");
                ImageStatus::Downloaded
            }
            Err(e) => {
                warn!(
                    file = %image.local_file_name,
                    url = %image.original_url,
                    error = %e,
                    "Error downloading image; leaving reference dangling"
                );
                ImageStatus::Failed
            }
        }
    }
}
