//! # Blog Archiver
//!
//! Converts a list of blog article URLs into a static-site-ready archive:
//! each article's main content is extracted, converted to Markdown,
//! stripped of platform boilerplate, and written with front matter next to
//! locally downloaded copies of its images.
//!
//! ## Usage
//!
//! ```sh
//! blog_archiver -i source/articles.json -o dist
//! ```
//!
//! ## Architecture
//!
//! The application is a linear pipeline, one article at a time:
//! 1. **Loading**: Read the ordered `{url}` list
//! 2. **Fetching**: Download the page and extract title, dates, hero image and body
//! 3. **Transforming**: HTML → Markdown, boilerplate removal, image link rewriting
//! 4. **Persisting**: Download images once, write the document under a date/slug path

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod http;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod sources;
mod transform;
mod utils;

use cli::Cli;
use config::ArchiveConfig;
use http::{ReqwestDownloader, RetryDownload, build_client};
use outputs::images::ImageStore;
use outputs::layout::OutputLayout;
use pipeline::Pipeline;
use scrapers::HttpArticleFetcher;
use transform::Transformer;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("blog_archiver starting up");

    let args = Cli::parse();
    debug!(input = ?args.input, output_dir = ?args.output_dir, config = ?args.config, "Parsed CLI arguments");

    let config = match ArchiveConfig::load(&args).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let sources = match sources::load_sources(&config.input).await {
        Ok(sources) => sources,
        Err(e) => {
            error!(error = %e, "Could not load the article list");
            return Err(e.into());
        }
    };

    let client = match build_client(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Could not build the HTTP client");
            return Err(e.into());
        }
    };
    let fetcher = HttpArticleFetcher::new(client.clone());
    let downloader = RetryDownload::new(
        ReqwestDownloader::new(client),
        config.retries,
        RETRY_BASE_DELAY,
    );
    let pipeline = Pipeline::new(
        fetcher,
        Transformer::from_config(&config),
        OutputLayout::new(&config.output_dir, config.layout, config.slug),
        ImageStore::new(
            downloader,
            config.skip_existing_images,
            config.image_concurrency,
        ),
    );

    let summary = match pipeline.run(&sources).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Archive run aborted");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = summary.total,
        written = summary.written,
        skipped = summary.skipped,
        images_downloaded = summary.images.downloaded,
        images_failed = summary.images.failed,
        "Execution complete"
    );

    Ok(())
}
