//! Output path derivation.
//!
//! ```text
//! per-article                         flat
//! dist/                               dist/
//! └── 2021/                           ├── articles/
//!     └── 05/                         │   └── 2021-05-04-my-post.md
//!         └── my-post/                └── images/
//!             ├── index.md                └── hero.png
//!             └── images/
//!                 └── hero.png
//! ```

use crate::config::{LayoutMode, SlugStrategy};
use crate::models::ExtractedArticle;
use crate::utils::{sanitize_filename, slug_from_url, slugify_title};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Where one article's document and images go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticlePaths {
    pub document: PathBuf,
    pub images_dir: PathBuf,
}

impl ArticlePaths {
    /// Directories that must exist before anything is written.
    pub fn directories(&self) -> Vec<&Path> {
        let mut dirs = vec![self.images_dir.as_path()];
        if let Some(parent) = self.document.parent() {
            if parent != self.images_dir {
                dirs.push(parent);
            }
        }
        dirs
    }
}

/// Maps articles to paths under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    mode: LayoutMode,
    slug: SlugStrategy,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, mode: LayoutMode, slug: SlugStrategy) -> Self {
        Self {
            root: root.into(),
            mode,
            slug,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories shared by all articles, created once per run.
    pub fn shared_directories(&self) -> Vec<PathBuf> {
        match self.mode {
            LayoutMode::PerArticle => vec![self.root.clone()],
            LayoutMode::Flat => vec![self.root.join("articles"), self.root.join("images")],
        }
    }

    /// Filesystem-safe slug for an article. Never empty.
    pub fn slug_for(&self, article: &ExtractedArticle) -> String {
        let from_title = || Some(slugify_title(&article.title)).filter(|s| !s.is_empty());
        let slug = match self.slug {
            SlugStrategy::Url => slug_from_url(&article.url).or_else(from_title),
            SlugStrategy::Title => from_title().or_else(|| slug_from_url(&article.url)),
        };
        let safe = slug.map(|s| sanitize_filename(&s)).unwrap_or_default();
        if safe.is_empty() {
            "article".to_string()
        } else {
            safe
        }
    }

    pub fn paths_for(&self, article: &ExtractedArticle, date: NaiveDate) -> ArticlePaths {
        let slug = self.slug_for(article);
        match self.mode {
            LayoutMode::PerArticle => {
                let article_dir = self
                    .root
                    .join(date.format("%Y").to_string())
                    .join(date.format("%m").to_string())
                    .join(&slug);
                ArticlePaths {
                    document: article_dir.join("index.md"),
                    images_dir: article_dir.join("images"),
                }
            }
            LayoutMode::Flat => ArticlePaths {
                document: self
                    .root
                    .join("articles")
                    .join(format!("{}-{}.md", date.format("%Y-%m-%d"), slug)),
                images_dir: self.root.join("images"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, title: &str) -> ExtractedArticle {
        ExtractedArticle {
            url: url.to_string(),
            title: title.to_string(),
            description: String::new(),
            published: "2021-05-04T00:00:00Z".to_string(),
            image: None,
            content: "<p>x</p>".to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 5, 4).unwrap()
    }

    #[test]
    fn test_flat_layout_paths() {
        let layout = OutputLayout::new("dist", LayoutMode::Flat, SlugStrategy::Url);
        let paths = layout.paths_for(&article("https://example.com/my-post-abc123", "My Post"), date());

        assert_eq!(paths.document, PathBuf::from("dist/articles/2021-05-04-my-post.md"));
        assert_eq!(paths.images_dir, PathBuf::from("dist/images"));
        assert_eq!(
            layout.shared_directories(),
            vec![PathBuf::from("dist/articles"), PathBuf::from("dist/images")]
        );
    }

    #[test]
    fn test_per_article_layout_paths() {
        let layout = OutputLayout::new("dist", LayoutMode::PerArticle, SlugStrategy::Title);
        let paths = layout.paths_for(&article("https://example.com/p/4f2a9c", "Why Rust? A Love Letter"), date());

        assert_eq!(paths.document, PathBuf::from("dist/2021/05/why-rust-a-love-letter/index.md"));
        assert_eq!(paths.images_dir, PathBuf::from("dist/2021/05/why-rust-a-love-letter/images"));
        assert_eq!(paths.directories().len(), 2);
    }

    #[test]
    fn test_slug_fallbacks() {
        let layout = OutputLayout::new("dist", LayoutMode::Flat, SlugStrategy::Url);
        assert_eq!(layout.slug_for(&article("https://example.com/", "Fallback Title")), "fallback-title");
        assert_eq!(layout.slug_for(&article("https://example.com/", "???")), "article");

        let layout = OutputLayout::new("dist", LayoutMode::Flat, SlugStrategy::Title);
        assert_eq!(layout.slug_for(&article("https://example.com/from-url", "")), "from-url");
    }

    #[test]
    fn test_slug_cannot_escape_root() {
        let layout = OutputLayout::new("dist", LayoutMode::PerArticle, SlugStrategy::Url);
        let paths = layout.paths_for(&article("https://example.com/..%2F..%2Fetc", "x"), date());
        assert!(paths.document.starts_with("dist/2021/05"));
        assert!(!paths.document.to_string_lossy().contains(".."));
    }
}
