//! Main-content and metadata extraction from an article page.
//!
//! Metadata is read from Open Graph / Twitter meta tags first, then from
//! JSON-LD (`application/ld+json`) blocks, then from plain HTML elements.
//! The body is the first non-empty semantic content region after noise
//! elements (scripts, navigation, footers, ...) have been detached.

use crate::models::ExtractedArticle;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, noscript, iframe, form, nav, footer, aside, svg").unwrap()
});
static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time[datetime]").unwrap());

/// Content regions in order of preference.
static CONTENT_REGIONS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", r#"[itemprop="articleBody"]"#, "main", r#"[role="main"]"#, "body"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Extract an article from a page.
///
/// Returns `None` when the page has no title or no textual main content.
/// The publish date is returned verbatim and may be empty; validating it is
/// left to the caller.
pub fn extract_article(page_url: &str, html: &str) -> Option<ExtractedArticle> {
    let mut document = Html::parse_document(html);
    let json_ld = json_ld_objects(&document);
    let base = Url::parse(page_url).ok();

    let title = meta_content(&document, &["og:title", "twitter:title"])
        .or_else(|| ld_string(&json_ld, "headline"))
        .or_else(|| first_text(&document, &TITLE))
        .or_else(|| first_text(&document, &H1))?;

    let description = meta_content(
        &document,
        &["og:description", "description", "twitter:description"],
    )
    .or_else(|| ld_string(&json_ld, "description"))
    .unwrap_or_default();

    let published = meta_content(
        &document,
        &["article:published_time", "og:published_time", "datePublished", "date"],
    )
    .or_else(|| ld_string(&json_ld, "datePublished"))
    .or_else(|| {
        document
            .select(&TIME)
            .find_map(|t| t.value().attr("datetime"))
            .map(|d| d.trim().to_string())
    })
    .unwrap_or_default();

    let image = meta_content(&document, &["og:image", "og:image:url", "twitter:image"])
        .or_else(|| ld_image(&json_ld))
        .map(|src| resolve(base.as_ref(), &src));

    strip_noise(&mut document);
    let content = main_content(&document)?;

    debug!(%title, %published, bytes = content.len(), "Extracted article");
    Some(ExtractedArticle {
        url: page_url.to_string(),
        title,
        description,
        published,
        image,
        content,
    })
}

/// `content` of the first `<meta>` whose `property`, `name` or `itemprop`
/// matches one of `keys`, tried in key order.
fn meta_content(document: &Html, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        ["property", "name", "itemprop"].iter().find_map(|attr| {
            let selector = Selector::parse(&format!(r#"meta[{attr}="{key}"]"#)).ok()?;
            document
                .select(&selector)
                .filter_map(|m| m.value().attr("content"))
                .map(str::trim)
                .find(|c| !c.is_empty())
                .map(str::to_string)
        })
    })
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every JSON object found in JSON-LD blocks, with `@graph` members flattened.
fn json_ld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            debug!("Ignoring unparseable JSON-LD block");
            continue;
        };
        collect_ld(value, &mut objects);
    }
    objects
}

fn collect_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| collect_ld(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_ld(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

fn ld_string(objects: &[Value], key: &str) -> Option<String> {
    objects
        .iter()
        .filter_map(|o| o.get(key)?.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// JSON-LD `image` as a string, an `ImageObject` with `url`, or a list of either.
fn ld_image(objects: &[Value]) -> Option<String> {
    fn image_url(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(map) => map.get("url").and_then(image_url),
            Value::Array(items) => items.iter().find_map(image_url),
            _ => None,
        }
    }
    objects.iter().find_map(|o| o.get("image").and_then(image_url))
}

fn resolve(base: Option<&Url>, src: &str) -> String {
    match base.and_then(|b| b.join(src).ok()) {
        Some(url) => url.to_string(),
        None => src.to_string(),
    }
}

fn strip_noise(document: &mut Html) {
    let ids: Vec<_> = document.select(&NOISE).map(|e| e.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn main_content(document: &Html) -> Option<String> {
    CONTENT_REGIONS.iter().find_map(|selector| {
        document
            .select(selector)
            .filter(has_text)
            .max_by_key(|e| text_len(e))
            .map(|e| e.inner_html().trim().to_string())
    })
}

fn text_len(element: &ElementRef<'_>) -> usize {
    element.text().map(|t| t.trim().len()).sum()
}

fn has_text(element: &ElementRef<'_>) -> bool {
    text_len(element) > 0
}
