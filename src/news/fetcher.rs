use crate::config::DigestSettings;
use crate::errors::{AppError, AppResult};
use crate::news::similarity::is_near_duplicate;
use crate::types::{FeedSource, NewsItem};
use reqwest::Client;
use tracing::{debug, warn};

const FEED_ACCEPT: &str = "application/rss+xml, application/rdf+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8";

/// Downloads feeds and reduces them to distinct headlines.
#[derive(Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Up to `cap` distinct headlines from `source`.
    ///
    /// A feed that cannot be fetched or parsed yields no items; the failure is
    /// logged against the feed's label.
    pub async fn fetch_items(
        &self,
        source: &FeedSource,
        cap: usize,
        settings: &DigestSettings,
    ) -> Vec<NewsItem> {
        let mut items = self.fetch_candidates_or_empty(source, settings).await;
        items.truncate(cap);
        items
    }

    pub(crate) async fn fetch_candidates_or_empty(
        &self,
        source: &FeedSource,
        settings: &DigestSettings,
    ) -> Vec<NewsItem> {
        match self.fetch_candidates(source, settings).await {
            Ok(items) => items,
            Err(e) => {
                warn!(feed = %source.label, error = %e, "Feed unavailable, section will be empty");
                Vec::new()
            }
        }
    }

    /// The deduplicated candidate pool for `source`, before any cap.
    pub async fn fetch_candidates(
        &self,
        source: &FeedSource,
        settings: &DigestSettings,
    ) -> AppResult<Vec<NewsItem>> {
        let body = self.fetch_body(&source.url).await?;
        let items = parse_items(&body)?;
        let found = items.len();
        let distinct = select_distinct(items, settings.candidate_pool, settings.similarity_threshold);
        debug!(feed = %source.label, found, kept = distinct.len(), "Parsed feed");
        Ok(distinct)
    }

    async fn fetch_body(&self, url: &str) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .header("Accept", FEED_ACCEPT)
            .send()
            .await
            .map_err(|e| AppError::feed_fetch(url, AppError::from(e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::feed_fetch(url, format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::feed_fetch(url, AppError::from(e).to_string()))
    }
}

/// Headlines of every entry in document order. Entries without a title are
/// skipped; a missing link becomes an empty string.
pub fn parse_items(body: &str) -> AppResult<Vec<NewsItem>> {
    let feed = feed_rs::parser::parse(body.as_bytes())?;
    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content.trim().to_string())?;
            if title.is_empty() {
                return None;
            }
            let link = entry
                .links
                .into_iter()
                .next()
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();
            Some(NewsItem { title, link })
        })
        .collect())
}

/// Walks `items` in order, keeping each one that is not a near-duplicate of an
/// already kept item. Stops once `pool` items are kept.
pub fn select_distinct(
    items: impl IntoIterator<Item = NewsItem>,
    pool: usize,
    threshold: f64,
) -> Vec<NewsItem> {
    let mut kept: Vec<NewsItem> = Vec::new();
    for item in items {
        if kept.len() >= pool {
            break;
        }
        let duplicate = kept
            .iter()
            .any(|existing| is_near_duplicate(&existing.title, &item.title, threshold));
        if duplicate {
            debug!(title = %item.title, "Skipping near-duplicate headline");
            continue;
        }
        kept.push(item);
    }
    kept
}
