//! Article fetching.
//!
//! Turns an article URL into an [`ExtractedArticle`]. The HTTP request and
//! content extraction are kept behind the [`ArticleFetcher`] trait so the
//! pipeline can run against in-memory pages in tests.
//!
//! # Result Semantics
//!
//! - `Ok(Some(article))`: page fetched and parsed
//! - `Ok(None)`: page fetched but no title or main content could be found
//! - `Err(_)`: network failure, timeout or non-success status
//!
//! Callers treat both `Ok(None)` and `Err(_)` as "skip this article".

pub mod readability;

use crate::models::ExtractedArticle;
use reqwest::Client;
use std::error::Error;
use tracing::{info, instrument};

/// Source of extracted articles.
pub trait ArticleFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<ExtractedArticle>, Box<dyn Error>>;
}

/// Fetches pages over HTTP and runs [`readability::extract_article`] on them.
#[derive(Debug, Clone)]
pub struct HttpArticleFetcher {
    client: Client,
}

impl HttpArticleFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ArticleFetcher for HttpArticleFetcher {
    #[instrument(level = "info", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<Option<ExtractedArticle>, Box<dyn Error>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let final_url = response.url().to_string();
        let body = response.text().await?;
        info!(bytes = body.len(), "Fetched article page");

        Ok(readability::extract_article(&final_url, &body))
    }
}
