//! Run configuration.
//!
//! Settings come from three places, highest precedence first: CLI flags,
//! an optional YAML file (`--config`), and the built-in defaults below.
//!
//! ```yaml
//! layout: per-article
//! header-policy: drop
//! slug: title
//! front-matter: false
//! image-link-prefix: ./images
//! skip-existing-images: true
//! image-concurrency: 4
//! timeout-secs: 20
//! retries: 3
//! excluded-image-fragments:
//!   - gravatar.com
//! ```

use crate::cli::Cli;
use crate::error::ArchiveError;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Avatar image the source platform embeds in every exported byline.
pub const AVATAR_IMAGE_FRAGMENT: &str = "1*_Zp5LjJUruaSaS58AHoS0w.png";

/// Query fragment marking blurred low-resolution preview images.
pub const PREVIEW_IMAGE_FRAGMENT: &str = "q=20";

const DEFAULT_USER_AGENT: &str = concat!("blog_archiver/", env!("CARGO_PKG_VERSION"));

/// Output directory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// `<out>/<year>/<month>/<slug>/index.md` with a per-article `images/` folder.
    PerArticle,
    /// `<out>/articles/<date>-<slug>.md` with a shared `<out>/images/` folder.
    #[default]
    Flat,
}

/// What happens to the platform byline block at the top of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderPolicy {
    /// Keep the reading-time label above a horizontal rule when present.
    #[default]
    KeepReadingTime,
    /// Remove the block entirely.
    Drop,
}

/// Source of the slug used in output paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SlugStrategy {
    /// Last path segment of the article URL, minus a trailing platform id.
    #[default]
    Url,
    /// Slugified article title.
    Title,
}

/// Settings as they appear in the YAML file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub layout: Option<LayoutMode>,
    pub header_policy: Option<HeaderPolicy>,
    pub slug: Option<SlugStrategy>,
    pub front_matter: Option<bool>,
    pub image_link_prefix: Option<String>,
    pub skip_existing_images: Option<bool>,
    pub image_concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<usize>,
    pub excluded_image_fragments: Vec<String>,
    pub user_agent: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub layout: LayoutMode,
    pub header_policy: HeaderPolicy,
    pub slug: SlugStrategy,
    pub front_matter: bool,
    pub image_link_prefix: String,
    pub skip_existing_images: bool,
    pub image_concurrency: usize,
    pub timeout: Duration,
    pub retries: usize,
    /// Substrings that exclude an image URL from download. Always contains
    /// the avatar and preview fragments.
    pub excluded_image_fragments: Vec<String>,
    pub user_agent: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        let layout = LayoutMode::default();
        Self {
            input: PathBuf::from("source/articles.json"),
            output_dir: PathBuf::from("dist"),
            layout,
            header_policy: HeaderPolicy::default(),
            slug: SlugStrategy::default(),
            front_matter: true,
            image_link_prefix: default_image_link_prefix(layout).to_string(),
            skip_existing_images: true,
            image_concurrency: 1,
            timeout: Duration::from_secs(30),
            retries: 2,
            excluded_image_fragments: builtin_exclusions(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Link prefix that resolves from the written document to its images.
///
/// Per-article documents sit next to their `images/` folder; flat documents
/// live in `articles/` and reach the shared folder through a site-relative path.
pub fn default_image_link_prefix(layout: LayoutMode) -> &'static str {
    match layout {
        LayoutMode::PerArticle => "./images",
        LayoutMode::Flat => "/images",
    }
}

fn builtin_exclusions() -> Vec<String> {
    vec![
        AVATAR_IMAGE_FRAGMENT.to_string(),
        PREVIEW_IMAGE_FRAGMENT.to_string(),
    ]
}

impl ArchiveConfig {
    /// Resolve the run configuration from parsed CLI arguments.
    ///
    /// Reads the YAML file named by `--config` when present.
    #[instrument(level = "info", skip_all, fields(config = ?cli.config))]
    pub async fn load(cli: &Cli) -> Result<Self, ArchiveError> {
        let file = match &cli.config {
            Some(path) => read_file_config(Path::new(path)).await?,
            None => FileConfig::default(),
        };
        let config = Self::resolve(cli, file)?;
        info!(
            layout = ?config.layout,
            header_policy = ?config.header_policy,
            slug = ?config.slug,
            front_matter = config.front_matter,
            image_concurrency = config.image_concurrency,
            "Resolved configuration"
        );
        Ok(config)
    }

    /// Merge CLI flags over file settings over defaults.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, ArchiveError> {
        let defaults = ArchiveConfig::default();
        let layout = cli.layout.or(file.layout).unwrap_or(defaults.layout);

        let image_concurrency = cli
            .image_concurrency
            .or(file.image_concurrency)
            .unwrap_or(defaults.image_concurrency);
        if image_concurrency == 0 {
            return Err(ArchiveError::InvalidConfig(
                "image-concurrency must be at least 1".to_string(),
            ));
        }

        let timeout_secs = cli.timeout_secs.or(file.timeout_secs);
        if timeout_secs == Some(0) {
            return Err(ArchiveError::InvalidConfig(
                "timeout-secs must be at least 1".to_string(),
            ));
        }

        let image_link_prefix = cli
            .image_link_prefix
            .clone()
            .or(file.image_link_prefix)
            .unwrap_or_else(|| default_image_link_prefix(layout).to_string());

        let mut excluded_image_fragments = builtin_exclusions();
        for fragment in file.excluded_image_fragments {
            if !fragment.is_empty() && !excluded_image_fragments.contains(&fragment) {
                excluded_image_fragments.push(fragment);
            }
        }

        let skip_existing_images = if cli.redownload_images {
            false
        } else {
            file.skip_existing_images
                .unwrap_or(defaults.skip_existing_images)
        };

        let config = ArchiveConfig {
            input: PathBuf::from(&cli.input),
            output_dir: PathBuf::from(&cli.output_dir),
            layout,
            header_policy: cli
                .header_policy
                .or(file.header_policy)
                .unwrap_or(defaults.header_policy),
            slug: cli.slug.or(file.slug).unwrap_or(defaults.slug),
            front_matter: cli
                .front_matter_override()
                .or(file.front_matter)
                .unwrap_or(defaults.front_matter),
            image_link_prefix: image_link_prefix.trim_end_matches('/').to_string(),
            skip_existing_images,
            image_concurrency,
            timeout: timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout),
            retries: cli.retries.or(file.retries).unwrap_or(defaults.retries),
            excluded_image_fragments,
            user_agent: file.user_agent.unwrap_or(defaults.user_agent),
        };
        debug!(?config, "Merged configuration");
        Ok(config)
    }
}

async fn read_file_config(path: &Path) -> Result<FileConfig, ArchiveError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ArchiveError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
    parse_file_config(&raw, path)
}

fn parse_file_config(raw: &str, path: &Path) -> Result<FileConfig, ArchiveError> {
    if raw.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(raw).map_err(|source| ArchiveError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
