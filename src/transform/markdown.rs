//! HTML to Markdown conversion and image reference rewriting.

use crate::models::ImageReference;
use crate::utils::{image_file_name, truncate_for_log};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::Html;
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// `![alt](url "optional title")` plus an immediately following blank line.
/// The URL may contain balanced parentheses, as in `Foo_(bar).png`.
static IMAGE_MARKDOWN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"!\[(?P<alt>[^\]\n]*)\]\((?P<url>(?:[^()\s]|\([^()\s]*\))+)(?:\s+"[^"\n]*")?\)(?P<trail>\n\n)?"#,
    )
    .unwrap()
});

static IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

/// One attribute of a tag, with an optional quoted or bare value.
static TAG_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+(?P<name>[^\s"'<>/=]+)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?"#).unwrap()
});

/// `html2md` keeps an `<img>` carrying any of these as raw HTML.
const GEOMETRY_ATTRIBUTES: [&str; 3] = ["width", "height", "align"];

/// Remove `width`, `height` and `align` from every `<img>` tag so the
/// converter emits `![alt](src)` for it.
fn strip_image_geometry(html: &str) -> Cow<'_, str> {
    IMG_TAG.replace_all(html, |tag: &Captures<'_>| {
        TAG_ATTRIBUTE
            .replace_all(&tag[0], |attr: &Captures<'_>| {
                let name = attr["name"].to_ascii_lowercase();
                if GEOMETRY_ATTRIBUTES.contains(&name.as_str()) {
                    String::new()
                } else {
                    attr[0].to_string()
                }
            })
            .into_owned()
    })
}

/// Convert an HTML fragment to Markdown.
///
/// Falls back to the fragment's plain text if the converter panics on
/// malformed input, so a single hostile page cannot abort the run.
pub fn html_to_markdown(html: &str) -> String {
    let html = strip_image_geometry(html);
    let html = html.as_ref();
    match std::panic::catch_unwind(|| html2md::parse_html(html)) {
        Ok(markdown) => markdown,
        Err(_) => {
            warn!(
                html = %truncate_for_log(html, 200),
                "Markdown conversion failed; falling back to plain text"
            );
            Html::parse_fragment(html)
                .root_element()
                .text()
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Result of [`rewrite_images`].
#[derive(Debug, Default)]
pub struct RewrittenImages {
    pub markdown: String,
    /// One entry per local file name, in order of first appearance.
    pub images: Vec<ImageReference>,
    /// Occurrences deleted because their URL matched an exclusion.
    pub filtered: usize,
    /// Occurrences pointed at a local file, duplicates included.
    pub occurrences: usize,
}

/// Rules for [`rewrite_images`].
#[derive(Debug, Clone, Copy)]
pub struct ImageRewrite<'a> {
    /// Page URL relative image sources are resolved against.
    pub base_url: Option<&'a Url>,
    /// Substrings that exclude an image URL.
    pub excluded_fragments: &'a [String],
    /// Prefix of rewritten links, without a trailing slash.
    pub link_prefix: &'a str,
}

impl ImageRewrite<'_> {
    /// Absolute URL for an image source, or `None` when it is not HTTP(S).
    pub fn resolve(&self, src: &str) -> Option<String> {
        let url = match self.base_url {
            Some(base) => base.join(src).ok()?,
            None => Url::parse(src).ok()?,
        };
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded_fragments
            .iter()
            .any(|fragment| url.contains(fragment.as_str()))
    }

    /// Link to a local file. The name is percent-encoded so spaces and
    /// parentheses still form a valid Markdown destination.
    pub fn local_link(&self, file_name: &str) -> String {
        format!("{}/{}", self.link_prefix, urlencoding::encode(file_name))
    }
}

/// Find every `![..](..)` image, point it at its local copy and drop
/// excluded images.
///
/// The returned `images` list is the only record of what to download;
/// nothing downstream looks at the HTML again. Excluded occurrences are
/// removed together with a following blank line.
/// Sources that are not HTTP(S) (e.g. `data:` URIs) are left untouched.
pub fn rewrite_images(markdown: &str, rules: &ImageRewrite<'_>) -> RewrittenImages {
    let mut images: Vec<ImageReference> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut filtered = 0usize;
    let mut occurrences = 0usize;

    let rewritten = IMAGE_MARKDOWN.replace_all(markdown, |caps: &Captures<'_>| {
        let src = &caps["url"];
        let trail = caps.name("trail").map_or("", |m| m.as_str());

        if rules.is_excluded(src) {
            debug!(%src, "Dropping excluded image");
            filtered += 1;
            return String::new();
        }
        let Some(url) = rules.resolve(src) else {
            return caps[0].to_string();
        };
        if rules.is_excluded(&url) {
            debug!(%url, "Dropping excluded image");
            filtered += 1;
            return String::new();
        }

        occurrences += 1;
        let file_name = image_file_name(&url);
        if seen.insert(file_name.clone()) {
            images.push(ImageReference {
                original_url: url,
                local_file_name: file_name.clone(),
            });
        }
        format!("![{}]({}){}", &caps["alt"], rules.local_link(&file_name), trail)
    });

    RewrittenImages {
        markdown: rewritten.into_owned(),
        images,
        filtered,
        occurrences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclusions() -> Vec<String> {
        vec!["1*_Zp5LjJUruaSaS58AHoS0w.png".to_string(), "q=20".to_string()]
    }

    #[test]
    fn test_html_to_markdown_images() {
        let md = html_to_markdown(r#"<p>Look <img src="https://cdn.example.com/a.png" alt="A"></p>"#);
        assert!(md.contains("![A](https://cdn.example.com/a.png)"), "{md}");
    }

    #[test]
    fn test_html_to_markdown_images_with_geometry() {
        let html = r#"<p>Hi</p><figure><img alt="" src="https://miro.medium.com/max/700/1*Abc.png" width="700" height="394" align="center"></figure>"#;
        let md = html_to_markdown(html);
        assert!(md.contains("![](https://miro.medium.com/max/700/1*Abc.png)"), "{md}");
        assert!(!md.contains("<img"), "{md}");
    }

    #[test]
    fn test_strip_image_geometry_keeps_other_attributes() {
        let html = r#"<img alt="width of 700" WIDTH=700 src='https://x.example/a.png' height="1"/><p width="3">p</p>"#;
        assert_eq!(
            strip_image_geometry(html),
            r#"<img alt="width of 700" src='https://x.example/a.png'/><p width="3">p</p>"#
        );
    }

    #[test]
    fn test_rewrite_keeps_parentheses_in_urls() {
        let rules = ImageRewrite {
            base_url: None,
            excluded_fragments: &[],
            link_prefix: "./images",
        };
        let out = rewrite_images("![](https://upload.example.org/Foo_(bar).png)\n", &rules);

        assert_eq!(out.images.len(), 1);
        assert_eq!(out.images[0].original_url, "https://upload.example.org/Foo_(bar).png");
        assert_eq!(out.images[0].local_file_name, "Foo_(bar).png");
        assert_eq!(out.markdown, "![](./images/Foo_%28bar%29.png)\n");
    }

    #[test]
    fn test_local_links_with_spaces_stay_valid_markdown() {
        let rules = ImageRewrite {
            base_url: None,
            excluded_fragments: &[],
            link_prefix: "./images",
        };
        let out = rewrite_images("![](https://cdn.example.com/my%20diagram.png)", &rules);

        assert_eq!(out.images[0].local_file_name, "my diagram.png");
        assert_eq!(out.markdown, "![](./images/my%20diagram.png)");
        assert!(IMAGE_MARKDOWN.is_match(&out.markdown));
    }

    #[test]
    fn test_rewrite_ignores_plain_links() {
        let rules = ImageRewrite {
            base_url: None,
            excluded_fragments: &[],
            link_prefix: "/images",
        };
        let md = "[not an image](https://x.example/1.png)\n";
        let out = rewrite_images(md, &rules);

        assert_eq!(out.markdown, md);
        assert!(out.images.is_empty());
    }

    #[test]
    fn test_rewrite_points_at_local_files() {
        let base = Url::parse("https://blog.example.com/posts/p1").unwrap();
        let excluded = exclusions();
        let rules = ImageRewrite {
            base_url: Some(&base),
            excluded_fragments: &excluded,
            link_prefix: "./images",
        };
        let md = "![Diagram](https://miro.medium.com/max/700/1*AbC.png)\n\nText\n\n![](/media/local.jpg)\n\n";
        let out = rewrite_images(md, &rules);

        assert_eq!(
            out.markdown,
            "![Diagram](./images/1AbC.png)\n\nText\n\n![](./images/local.jpg)\n\n"
        );
        assert_eq!(out.images.len(), 2);
        assert_eq!(out.images[0].original_url, "https://miro.medium.com/max/700/1*AbC.png");
        assert_eq!(out.images[1].original_url, "https://blog.example.com/media/local.jpg");
        assert_eq!(out.filtered, 0);
        assert!(!out.markdown.contains("http"));
    }

    #[test]
    fn test_rewrite_drops_excluded_with_blank_line() {
        let excluded = exclusions();
        let rules = ImageRewrite {
            base_url: None,
            excluded_fragments: &excluded,
            link_prefix: "/images",
        };
        let md = "Start\n\n![](https://miro.medium.com/max/60/1*x.png?q=20)\n\n![](https://miro.medium.com/1*_Zp5LjJUruaSaS58AHoS0w.png)\n\nEnd\n";
        let out = rewrite_images(md, &rules);

        assert_eq!(out.markdown, "Start\n\nEnd\n");
        assert!(out.images.is_empty());
        assert_eq!(out.filtered, 2);
    }

    #[test]
    fn test_rewrite_deduplicates_by_file_name() {
        let rules = ImageRewrite {
            base_url: None,
            excluded_fragments: &[],
            link_prefix: "/images",
        };
        let md = "![](https://a.example/x/pic.png) ![](https://a.example/x/pic.png) ![](https://b.example/y/pic.png)";
        let out = rewrite_images(md, &rules);

        assert_eq!(out.images.len(), 1);
        assert_eq!(out.occurrences, 3);
        assert_eq!(
            out.markdown,
            "![](/images/pic.png) ![](/images/pic.png) ![](/images/pic.png)"
        );
    }

    #[test]
    fn test_rewrite_leaves_data_uris() {
        let rules = ImageRewrite {
            base_url: None,
            excluded_fragments: &[],
            link_prefix: "/images",
        };
        let md = "![](data:image/gif;base64,R0lGOD)";
        let out = rewrite_images(md, &rules);
        assert_eq!(out.markdown, md);
        assert!(out.images.is_empty());
    }

    #[test]
    fn test_rewrite_sanitizes_hostile_names() {
        let rules = ImageRewrite {
            base_url: None,
            excluded_fragments: &[],
            link_prefix: "./images",
        };
        let out = rewrite_images("![](https://evil.example/a/..%2F..%2Fescape%3A.png)", &rules);
        let name = &out.images[0].local_file_name;
        assert!(!name.contains('/') && !name.contains(':'), "{name}");
        assert_eq!(
            out.markdown,
            format!("![](./images/{})", urlencoding::encode(name))
        );
    }
}
