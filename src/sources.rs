//! Input list loading.
//!
//! The input is a JSON or YAML sequence of `{url}` records. YAML is chosen
//! for `.yaml`/`.yml` files, JSON otherwise. Order is preserved and defines
//! processing order. Any problem with the list is fatal.

use crate::error::ArchiveError;
use crate::models::ArticleSource;
use std::path::Path;
use tracing::{debug, info, instrument};
use url::Url;

/// Read and validate the article list at `path`.
///
/// # Errors
///
/// - [`ArchiveError::InputRead`] if the file cannot be read
/// - [`ArchiveError::InputParse`] if it is not a list of `{url}` records
/// - [`ArchiveError::InvalidSourceUrl`] if an entry is not an absolute HTTP(S) URL
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_sources(path: &Path) -> Result<Vec<ArticleSource>, ArchiveError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ArchiveError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;

    let sources = parse_sources(&raw, path)?;
    info!(count = sources.len(), "Loaded article list");
    debug!(urls = ?sources.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(), "Article URLs");
    Ok(sources)
}

fn parse_sources(raw: &str, path: &Path) -> Result<Vec<ArticleSource>, ArchiveError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let sources: Vec<ArticleSource> = if is_yaml {
        serde_yaml::from_str(raw).map_err(|e| ArchiveError::InputParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        serde_json::from_str(raw).map_err(|e| ArchiveError::InputParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    for (index, source) in sources.iter().enumerate() {
        validate_url(index, &source.url)?;
    }
    Ok(sources)
}

fn validate_url(index: usize, raw: &str) -> Result<(), ArchiveError> {
    let invalid = |reason: String| ArchiveError::InvalidSourceUrl {
        index,
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {other:?}"))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_list_preserves_order() {
        let raw = r#"[
            {"url": "https://example.com/first-aaa111"},
            {"url": "https://example.com/second-bbb222"},
            {"url": "http://example.org/third"}
        ]"#;
        let sources = parse_sources(raw, Path::new("articles.json")).unwrap();
        let urls: Vec<_> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/first-aaa111",
                "https://example.com/second-bbb222",
                "http://example.org/third",
            ]
        );
    }

    #[test]
    fn test_parse_yaml_list() {
        let raw = "- url: https://example.com/a\n- url: https://example.com/b\n";
        let sources = parse_sources(raw, Path::new("articles.yml")).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://example.com/a");
    }

    #[test]
    fn test_empty_list_is_valid() {
        let sources = parse_sources("[]", Path::new("articles.json")).unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn test_malformed_list_is_fatal() {
        let err = parse_sources(r#"{"url": "https://example.com"}"#, Path::new("a.json"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::InputParse { .. }));

        let err = parse_sources(r#"[{"link": "https://example.com"}]"#, Path::new("a.json"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::InputParse { .. }));
    }

    #[test]
    fn test_non_http_url_is_fatal() {
        let raw = r#"[{"url": "https://example.com/ok"}, {"url": "file:///etc/passwd"}]"#;
        let err = parse_sources(raw, Path::new("a.json")).unwrap_err();
        match err {
            ArchiveError::InvalidSourceUrl { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_relative_url_is_fatal() {
        let err = parse_sources(r#"[{"url": "/blog/post"}]"#, Path::new("a.json")).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidSourceUrl { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_load_sources_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        tokio::fs::write(&path, r#"[{"url": "https://example.com/my-post-abc123"}]"#)
            .await
            .unwrap();

        let sources = load_sources(&path).await.unwrap();
        assert_eq!(sources, vec![ArticleSource {
            url: "https://example.com/my-post-abc123".to_string()
        }]);
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sources(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, ArchiveError::InputRead { .. }));
    }
}
