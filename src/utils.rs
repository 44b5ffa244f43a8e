//! Utility functions for file naming, slugs, string manipulation, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Filename sanitization for anything derived from untrusted URLs
//! - Slugification of titles and URL path segments
//! - URL basename extraction for image file names
//! - String truncation for logging
//! - File system validation for output directories

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Longest file name most file systems accept, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

/// Longest slug produced for a title or URL segment, in characters.
const MAX_SLUG_CHARS: usize = 80;

static RESERVED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").unwrap()
});

/// Trailing `-<id>` suffix appended to post URLs by some blogging platforms,
/// e.g. `my-post-4f2a9c1b7e3d`.
static ID_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([A-Za-z0-9]{6,16})$").unwrap());

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (on a character boundary) with
/// an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Make a string safe to use as a single file or directory name.
///
/// Removes path separators, characters reserved on common file systems,
/// and control characters; rejects `.`, `..` and reserved device names;
/// strips trailing dots and spaces; truncates to 255 bytes. The result
/// may be empty, in which case callers substitute their own fallback.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd");
/// assert_eq!(sanitize_filename("1*abc:def.png"), "1abcdef.png");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '<' | '>' | ':' | '*' | '|' | '"'))
        .filter(|c| !c.is_control())
        .collect();

    if cleaned == "." || cleaned == ".." || RESERVED_NAME.is_match(&cleaned) {
        return String::new();
    }

    while cleaned.ends_with('.') || cleaned.ends_with(' ') {
        cleaned.pop();
    }

    if cleaned.len() > MAX_FILENAME_BYTES {
        let mut cut = MAX_FILENAME_BYTES;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
    }
    cleaned
}

/// Convert a title to a URL-friendly slug.
///
/// Lowercases the text and collapses every run of non-alphanumeric
/// characters into a single hyphen. Leading and trailing hyphens are
/// dropped and the result is capped at 80 characters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Test-Article!"), "test-article");
/// ```
pub fn slugify_title(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.chars().count() > MAX_SLUG_CHARS {
        slug = slug.chars().take(MAX_SLUG_CHARS).collect();
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// Last non-empty path segment of a URL, percent-decoded.
///
/// Query strings and fragments are ignored. Falls back to plain string
/// splitting when the input does not parse as an absolute URL.
pub fn last_path_segment(raw: &str) -> Option<String> {
    let segment = match Url::parse(raw) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .and_then(|path| path.split('/').filter(|s| !s.is_empty()).last())
            .map(str::to_string),
    }?;

    let decoded = urlencoding::decode(&segment)
        .map(|d| d.into_owned())
        .unwrap_or(segment);
    Some(decoded)
}

/// Local file name for an image URL: its sanitized basename.
///
/// Always returns a non-empty name that is safe to join onto an images
/// directory.
pub fn image_file_name(image_url: &str) -> String {
    let name = last_path_segment(image_url)
        .map(|segment| sanitize_filename(&segment))
        .unwrap_or_default();
    if name.is_empty() {
        "image".to_string()
    } else {
        name
    }
}

/// Slug derived from the last path segment of an article URL.
///
/// A trailing platform id (`-` followed by 6 to 16 alphanumerics including
/// at least one digit) is stripped before slugifying.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slug_from_url("https://example.com/my-post-abc123").as_deref(), Some("my-post"));
/// ```
pub fn slug_from_url(article_url: &str) -> Option<String> {
    let segment = last_path_segment(article_url)?;
    let stem = match ID_SUFFIX.captures(&segment) {
        Some(caps) if caps[1].chars().any(|c| c.is_ascii_digit()) => {
            segment[..segment.len() - caps[0].len()].to_string()
        }
        _ => segment,
    };
    let slug = slugify_title(&stem);
    if slug.is_empty() { None } else { Some(slug) }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be created or
/// is not writable (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}
