use crate::errors::{AppError, AppResult};
use reqwest::Client;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("briefing-bot/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by feed fetching, delivery and directory lookups.
///
/// Every request made through it is bounded by `timeout`, so one hung feed or
/// recipient cannot stall a whole batch.
pub fn build_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| AppError::invalid_config("HTTP client", e.to_string()))
}
