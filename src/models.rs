//! Data models for the archive pipeline.
//!
//! This module defines the core data structures passed between stages:
//! - [`ArticleSource`]: One entry of the input list
//! - [`ExtractedArticle`]: Structured article produced by the fetcher
//! - [`TransformedDocument`]: Markdown body, front matter and the images it references
//! - [`ImageReport`], [`ArticleOutcome`], [`RunSummary`]: Per-scope results
//!   returned to callers instead of process-wide counters

use serde::Deserialize;
use std::path::PathBuf;

/// An article to archive, as listed in the input file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArticleSource {
    /// Absolute HTTP(S) URL of the article page.
    pub url: String,
}

/// Article content and metadata extracted from a fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    /// Canonical URL the article was fetched from.
    pub url: String,
    /// The article title/headline.
    pub title: String,
    /// Short summary, usually the page's meta description. May be empty.
    pub description: String,
    /// Publish timestamp exactly as the page declares it. Starts with `YYYY-MM-DD`.
    pub published: String,
    /// Absolute URL of the hero image, if the page declares one.
    pub image: Option<String>,
    /// HTML of the main content region.
    pub content: String,
}

impl ExtractedArticle {
    /// The `YYYY-MM-DD` prefix of [`ExtractedArticle::published`].
    ///
    /// Returns `None` when the prefix is missing or is not a calendar date.
    pub fn publish_date(&self) -> Option<chrono::NaiveDate> {
        let prefix = self.published.trim().get(..10)?;
        chrono::NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}

/// A remote image referenced by a transformed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Absolute URL the image is downloaded from.
    pub original_url: String,
    /// Sanitized file name inside the images directory.
    pub local_file_name: String,
}

/// Front matter fields for static site generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub layout: String,
    pub title: String,
    pub description: String,
    /// Local link to the hero image.
    pub image: Option<String>,
    pub date: String,
}

/// Result of the content transformation for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedDocument {
    pub front_matter: Option<FrontMatter>,
    pub body: String,
    /// Images to download, in order of first appearance, one entry per file name.
    pub images: Vec<ImageReference>,
    /// Image references pointed at local files, duplicates and hero included.
    pub image_occurrences: usize,
    /// Image occurrences removed by the exclusion filter.
    pub filtered_images: usize,
}

/// Image download counters for a single article.
///
/// `found` counts occurrences in the document; the download counters count
/// distinct files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageReport {
    pub found: usize,
    pub filtered: usize,
    pub downloaded: usize,
    /// Already on disk before this run touched it.
    pub skipped_existing: usize,
    /// Handled earlier in this run, successfully or not.
    pub reused: usize,
    pub failed: usize,
}

/// Why an article produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The page could not be fetched or parsed.
    ExtractionFailed(String),
    /// The page parsed but yielded no title or no main content.
    NoContent,
    /// The declared publish date does not start with `YYYY-MM-DD`.
    InvalidPublishDate(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ExtractionFailed(e) => write!(f, "extraction failed: {e}"),
            SkipReason::NoContent => write!(f, "no extractable content"),
            SkipReason::InvalidPublishDate(d) => write!(f, "invalid publish date {d:?}"),
        }
    }
}

/// What happened to one input article.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleOutcome {
    Written {
        path: PathBuf,
        images: ImageReport,
    },
    Skipped(SkipReason),
}

/// Totals for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub images: ImageReport,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ArticleOutcome) {
        self.total += 1;
        match outcome {
            ArticleOutcome::Written { images, .. } => {
                self.written += 1;
                self.images.found += images.found;
                self.images.filtered += images.filtered;
                self.images.downloaded += images.downloaded;
                self.images.skipped_existing += images.skipped_existing;
                self.images.reused += images.reused;
                self.images.failed += images.failed;
            }
            ArticleOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}
