//! Content transformation: extracted article in, archive-ready Markdown out.
//!
//! # Steps
//!
//! 1. Convert the HTML body to Markdown ([`markdown::html_to_markdown`])
//! 2. Strip platform boilerplate ([`boilerplate::strip_boilerplate`])
//! 3. Point images at local copies, drop excluded ones ([`markdown::rewrite_images`])
//! 4. In front matter mode, drop the title heading and build the header block
//! 5. Collapse blank-line runs left behind by removals
//!
//! Every step degrades to a no-op on content it does not recognise.

pub mod boilerplate;
pub mod front_matter;
pub mod markdown;

use crate::config::ArchiveConfig;
use crate::models::{ExtractedArticle, FrontMatter, ImageReference, TransformedDocument};
use crate::utils::image_file_name;
use boilerplate::{BoilerplateRule, strip_boilerplate};
use front_matter::{DEFAULT_LAYOUT, render_front_matter, strip_title_heading};
use markdown::{ImageRewrite, html_to_markdown, rewrite_images};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Transformation settings, fixed for a run.
#[derive(Debug, Clone)]
pub struct Transformer {
    pub rules: Vec<BoilerplateRule>,
    pub excluded_image_fragments: Vec<String>,
    pub image_link_prefix: String,
    pub front_matter: bool,
}

impl Transformer {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            rules: BoilerplateRule::defaults(config.header_policy),
            excluded_image_fragments: config.excluded_image_fragments.clone(),
            image_link_prefix: config.image_link_prefix.clone(),
            front_matter: config.front_matter,
        }
    }

    /// Transform one article. Never fails.
    #[instrument(level = "debug", skip_all, fields(url = %article.url))]
    pub fn transform(&self, article: &ExtractedArticle) -> TransformedDocument {
        let base_url = Url::parse(&article.url).ok();
        let image_rules = ImageRewrite {
            base_url: base_url.as_ref(),
            excluded_fragments: &self.excluded_image_fragments,
            link_prefix: &self.image_link_prefix,
        };

        let converted = html_to_markdown(&article.content);
        let cleaned = strip_boilerplate(&converted, &self.rules);
        let rewritten = rewrite_images(&cleaned, &image_rules);
        let mut images = rewritten.images;
        let mut filtered = rewritten.filtered;
        let mut occurrences = rewritten.occurrences;

        let (front_matter, body) = if self.front_matter {
            let hero = article.image.as_deref().and_then(|src| {
                let url = image_rules.resolve(src)?;
                if image_rules.is_excluded(&url) {
                    filtered += 1;
                    return None;
                }
                Some(url)
            });
            let hero_link = hero.map(|url| {
                let file_name = image_file_name(&url);
                let link = image_rules.local_link(&file_name);
                occurrences += 1;
                if !images.iter().any(|i| i.local_file_name == file_name) {
                    images.push(ImageReference {
                        original_url: url,
                        local_file_name: file_name,
                    });
                }
                link
            });

            let front_matter = FrontMatter {
                layout: DEFAULT_LAYOUT.to_string(),
                title: article.title.clone(),
                description: article.description.clone(),
                image: hero_link,
                date: article.published.clone(),
            };
            (Some(front_matter), strip_title_heading(&rewritten.markdown))
        } else {
            (None, rewritten.markdown)
        };

        let body = normalize_blank_lines(&body);
        debug!(
            images = images.len(),
            occurrences,
            filtered,
            bytes = body.len(),
            "Transformed article"
        );

        TransformedDocument {
            front_matter,
            body,
            images,
            image_occurrences: occurrences,
            filtered_images: filtered,
        }
    }
}

/// Collapse runs of blank lines to one, trim, and end with a single newline.
fn normalize_blank_lines(markdown: &str) -> String {
    let collapsed = BLANK_RUNS.replace_all(markdown, "\n\n");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

impl TransformedDocument {
    /// Full file content: front matter (if any) followed by the body.
    pub fn render(&self) -> String {
        match &self.front_matter {
            Some(front_matter) => format!("{}{}", render_front_matter(front_matter), self.body),
            None => self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AVATAR_IMAGE_FRAGMENT, HeaderPolicy, PREVIEW_IMAGE_FRAGMENT};

    fn transformer(front_matter: bool, prefix: &str) -> Transformer {
        Transformer {
            rules: BoilerplateRule::defaults(HeaderPolicy::KeepReadingTime),
            excluded_image_fragments: vec![
                AVATAR_IMAGE_FRAGMENT.to_string(),
                PREVIEW_IMAGE_FRAGMENT.to_string(),
            ],
            image_link_prefix: prefix.to_string(),
            front_matter,
        }
    }

    fn example_article() -> ExtractedArticle {
        ExtractedArticle {
            url: "https://example.com/my-post-abc123".to_string(),
            title: "My Post".to_string(),
            description: "desc".to_string(),
            published: "2021-05-04T00:00:00Z".to_string(),
            image: Some("https://cdn.example.com/media/hero.png".to_string()),
            content: "<h1>My Post</h1><p>Hello <img src='https://cdn.example.com/pic1.png?q=20'></p>"
                .to_string(),
        }
    }

    #[test]
    fn test_example_article_with_front_matter() {
        let doc = transformer(true, "/images").transform(&example_article());

        let fm = doc.front_matter.as_ref().unwrap();
        assert_eq!(fm.title, "My Post");
        assert_eq!(fm.date, "2021-05-04T00:00:00Z");
        assert_eq!(fm.image.as_deref(), Some("/images/hero.png"));

        assert!(!doc.body.contains("My Post"), "{}", doc.body);
        assert!(!doc.body.contains("pic1.png"), "{}", doc.body);
        assert!(!doc.body.contains("http"), "{}", doc.body);
        assert!(doc.body.contains("Hello"));
        assert_eq!(doc.filtered_images, 1);
        assert_eq!(doc.image_occurrences, 1);

        assert_eq!(
            doc.images,
            vec![ImageReference {
                original_url: "https://cdn.example.com/media/hero.png".to_string(),
                local_file_name: "hero.png".to_string(),
            }]
        );

        let rendered = doc.render();
        assert!(rendered.starts_with("---\nlayout: post\ntitle: 'My Post'\n"));
        assert!(rendered.contains("date: '2021-05-04T00:00:00Z'\n---\n"));
    }

    #[test]
    fn test_without_front_matter_keeps_heading() {
        let doc = transformer(false, "./images").transform(&example_article());
        assert!(doc.front_matter.is_none());
        assert!(doc.body.contains("My Post"));
        assert!(doc.images.is_empty());
        assert_eq!(doc.render(), doc.body);
    }

    #[test]
    fn test_body_images_are_local() {
        let mut article = example_article();
        article.content = r#"<p>One</p><p><img src="https://miro.medium.com/max/700/1*Diag.png" alt="d"></p><p><img src="/rel/two.jpg"></p>"#.to_string();
        article.image = None;
        let doc = transformer(true, "./images").transform(&article);

        let names: Vec<_> = doc.images.iter().map(|i| i.local_file_name.as_str()).collect();
        assert_eq!(names, vec!["1Diag.png", "two.jpg"]);
        assert_eq!(doc.images[1].original_url, "https://example.com/rel/two.jpg");
        assert!(doc.body.contains("](./images/1Diag.png)"));
        assert!(doc.body.contains("](./images/two.jpg)"));
        assert!(!doc.body.contains("https://"));
    }

    #[test]
    fn test_sized_images_are_local() {
        let mut article = example_article();
        article.content = r#"<p>Hi</p><figure><img alt="" src="https://miro.medium.com/max/700/1*Abc.png" width="700" height="394"></figure><p><img src="https://miro.medium.com/max/700/1*Abc.png" width="700"></p>"#.to_string();
        article.image = None;
        let doc = transformer(true, "./images").transform(&article);

        assert_eq!(
            doc.images,
            vec![ImageReference {
                original_url: "https://miro.medium.com/max/700/1*Abc.png".to_string(),
                local_file_name: "1Abc.png".to_string(),
            }]
        );
        assert_eq!(doc.image_occurrences, 2);
        assert!(doc.body.contains("![](./images/1Abc.png)"), "{}", doc.body);
        assert!(!doc.body.contains("<img"), "{}", doc.body);
        assert!(!doc.body.contains("https://"), "{}", doc.body);
    }

    #[test]
    fn test_excluded_hero_is_not_downloaded() {
        let mut article = example_article();
        article.image = Some(format!("https://miro.medium.com/{AVATAR_IMAGE_FRAGMENT}"));
        let doc = transformer(true, "/images").transform(&article);
        assert!(doc.front_matter.unwrap().image.is_none());
        assert!(doc.images.is_empty());
    }

    #[test]
    fn test_empty_content_does_not_panic() {
        let mut article = example_article();
        article.content = String::new();
        article.image = None;
        let doc = transformer(true, "/images").transform(&article);
        assert_eq!(doc.body, "");
        assert!(doc.images.is_empty());
    }

    #[test]
    fn test_normalize_blank_lines() {
        assert_eq!(normalize_blank_lines("\n\nA\n\n\n\nB\n \n\t\nC\n\n"), "A\n\nB\n\nC\n");
        assert_eq!(normalize_blank_lines("   \n"), "");
    }
}
