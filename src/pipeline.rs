//! The archive run: fetch → transform → persist, one article at a time.
//!
//! Per-article problems (fetch failure, no content, bad date) become
//! [`ArticleOutcome::Skipped`]; image failures are counted in the article's
//! [`ImageReport`]. Only filesystem failures on the output tree propagate as
//! [`ArchiveError`] and stop the run.

use crate::error::ArchiveError;
use crate::http::Download;
use crate::models::{ArticleOutcome, ArticleSource, ImageReport, RunSummary, SkipReason};
use crate::outputs::document::{ensure_directories, write_document};
use crate::outputs::images::ImageStore;
use crate::outputs::layout::OutputLayout;
use crate::scrapers::ArticleFetcher;
use crate::transform::Transformer;
use crate::utils::ensure_writable_dir;
use tracing::{error, info, instrument, warn};

pub struct Pipeline<F, D> {
    fetcher: F,
    transformer: Transformer,
    layout: OutputLayout,
    images: ImageStore<D>,
}

impl<F, D> Pipeline<F, D>
where
    F: ArticleFetcher,
    D: Download,
{
    pub fn new(
        fetcher: F,
        transformer: Transformer,
        layout: OutputLayout,
        images: ImageStore<D>,
    ) -> Self {
        Self {
            fetcher,
            transformer,
            layout,
            images,
        }
    }

    /// Check the output root is writable and create the shared directories.
    #[instrument(level = "info", skip_all, fields(root = %self.layout.root().display()))]
    pub async fn prepare(&self) -> Result<(), ArchiveError> {
        let root = self.layout.root();
        if let Err(e) = ensure_writable_dir(root).await {
            error!(
                path = %root.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(ArchiveError::OutputDir {
                path: root.to_path_buf(),
                source: e,
            });
        }
        ensure_directories(&self.layout.shared_directories()).await
    }

    /// Process every source in order.
    pub async fn run(&self, sources: &[ArticleSource]) -> Result<RunSummary, ArchiveError> {
        info!("Scraping {} blog articles", sources.len());
        self.prepare().await?;

        let mut summary = RunSummary::default();
        for (i, source) in sources.iter().enumerate() {
            let outcome = self.process(i + 1, source).await?;
            summary.record(&outcome);
        }

        info!(
            total = summary.total,
            written = summary.written,
            skipped = summary.skipped,
            images_downloaded = summary.images.downloaded,
            images_skipped = summary.images.skipped_existing,
            images_reused = summary.images.reused,
            images_failed = summary.images.failed,
            "Archive run finished"
        );
        Ok(summary)
    }

    /// Fetch, transform and persist a single article.
    #[instrument(level = "info", skip_all, fields(index = index, url = %source.url))]
    pub async fn process(
        &self,
        index: usize,
        source: &ArticleSource,
    ) -> Result<ArticleOutcome, ArchiveError> {
        info!("Processing blog article {index}");

        let article = match self.fetcher.fetch(&source.url).await {
            Ok(Some(article)) => article,
            Ok(None) => {
                warn!("Article produced no content; skipping");
                return Ok(ArticleOutcome::Skipped(SkipReason::NoContent));
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed; skipping");
                return Ok(ArticleOutcome::Skipped(SkipReason::ExtractionFailed(
                    e.to_string(),
                )));
            }
        };

        let Some(date) = article.publish_date() else {
            warn!(published = %article.published, "Article has no usable publish date; skipping");
            return Ok(ArticleOutcome::Skipped(SkipReason::InvalidPublishDate(
                article.published.clone(),
            )));
        };

        let document = self.transformer.transform(&article);
        let paths = self.layout.paths_for(&article, date);
        ensure_directories(&paths.directories()).await?;

        let found = document.image_occurrences + document.filtered_images;
        info!(
            files = document.images.len(),
            "Found {found} images for blog article {index}"
        );
        let downloaded = self
            .images
            .download_all(&document.images, &paths.images_dir)
            .await;
        let report = ImageReport {
            found,
            filtered: document.filtered_images,
            ..downloaded
        };
        info!(
            downloaded = report.downloaded,
            skipped_existing = report.skipped_existing,
            reused = report.reused,
            filtered = report.filtered,
            failed = report.failed,
            "Downloaded {} images for blog article {index}",
            report.downloaded
        );

        let path = write_document(&paths.document, &document.render()).await?;
        Ok(ArticleOutcome::Written {
            path,
            images: report,
        })
    }
}
