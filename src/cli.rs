//! Command-line interface definitions for the blog archiver.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every pipeline option can also be set in the YAML config file; flags given
//! here take precedence over the file.

use crate::config::{HeaderPolicy, LayoutMode, SlugStrategy};
use clap::Parser;

/// Command-line arguments for the blog archiver.
///
/// # Examples
///
/// ```sh
/// # Archive the default list into ./dist using the flat layout
/// blog_archiver
///
/// # Per-article folders, no front matter
/// blog_archiver -i articles.yaml -o site --layout per-article --no-front-matter
///
/// # Re-download every image, four at a time
/// blog_archiver --redownload-images --image-concurrency 4
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON or YAML file listing the articles to archive (`[{url: ...}]`)
    #[arg(short, long, env = "BLOG_ARCHIVER_INPUT", default_value = "source/articles.json")]
    pub input: String,

    /// Root of the generated archive
    #[arg(short, long, env = "BLOG_ARCHIVER_OUTPUT", default_value = "dist")]
    pub output_dir: String,

    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory layout
    #[arg(long, value_enum)]
    pub layout: Option<LayoutMode>,

    /// How the platform byline header is cleaned up
    #[arg(long, value_enum)]
    pub header_policy: Option<HeaderPolicy>,

    /// Where document slugs come from
    #[arg(long, value_enum)]
    pub slug: Option<SlugStrategy>,

    /// Prepend a front matter block and drop the leading title heading
    #[arg(long, conflicts_with = "no_front_matter")]
    pub front_matter: bool,

    /// Write the converted body only
    #[arg(long)]
    pub no_front_matter: bool,

    /// Path prefix used for rewritten image links (e.g. `./images`, `/assets/img`)
    #[arg(long)]
    pub image_link_prefix: Option<String>,

    /// Download images even when a file with the same name already exists
    #[arg(long)]
    pub redownload_images: bool,

    /// Maximum parallel image downloads within one article
    #[arg(long)]
    pub image_concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries per image download after the first attempt
    #[arg(long)]
    pub retries: Option<usize>,
}

impl Cli {
    /// Front matter toggle as an override: `None` when neither flag was given.
    pub fn front_matter_override(&self) -> Option<bool> {
        if self.no_front_matter {
            Some(false)
        } else if self.front_matter {
            Some(true)
        } else {
            None
        }
    }
}
