pub mod alert;
pub mod briefing;
pub mod scheduler;
pub mod types;

use crate::config::{AppConfig, DigestSettings};
use crate::directory::{Directory, SupabaseDirectory};
use crate::errors::AppResult;
use crate::http;
use crate::news::{Aggregator, FeedFetcher};
use crate::telegram::TelegramClient;
use crate::types::{Dialect, FeedSource};
use std::sync::Arc;

pub use types::RunReport;

/// Everything a briefing or alert run needs.
pub struct BriefingService {
    directory: Arc<dyn Directory>,
    aggregator: Aggregator,
    telegram: TelegramClient,
    feeds: Vec<FeedSource>,
    settings: DigestSettings,
}

impl BriefingService {
    pub fn new(
        directory: Arc<dyn Directory>,
        aggregator: Aggregator,
        telegram: TelegramClient,
        feeds: Vec<FeedSource>,
        settings: DigestSettings,
    ) -> Self {
        Self {
            directory,
            aggregator,
            telegram,
            feeds,
            settings,
        }
    }

    /// Wire up the Supabase directory, feed fetcher and Telegram client over
    /// one HTTP client.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = http::build_client(config.http_timeout)?;
        Ok(Self::new(
            Arc::new(SupabaseDirectory::new(client.clone(), config.directory.clone())),
            Aggregator::new(FeedFetcher::new(client.clone())),
            TelegramClient::new(client, &config.telegram_api_base_url),
            config.feeds.clone(),
            config.digest.clone(),
        ))
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    pub fn telegram(&self) -> &TelegramClient {
        &self.telegram
    }

    /// Digest of the configured feeds in `dialect`.
    pub async fn build_digest(&self, dialect: Dialect) -> String {
        self.aggregator
            .build_digest(&self.feeds, dialect, &self.settings)
            .await
    }
}
