use thiserror::Error;

/// Application-wide error types.
///
/// Per-feed and per-recipient failures are absorbed close to where they happen
/// (an empty section, a failed `DeliveryOutcome`); only configuration and
/// directory failures are expected to reach the top level.
#[derive(Debug, Error)]
pub enum AppError {
    // Configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),
    #[error("Invalid {key}: {message}")]
    InvalidConfig { key: String, message: String },

    // Feed-related errors
    #[error("Feed request failed for {url}: {message}")]
    FeedFetch { url: String, message: String },
    #[error("Unable to parse feed - invalid format: {0}")]
    FeedParse(String),

    // Delivery errors
    #[error("{0}")]
    Delivery(String),
    #[error("Network error: {0}")]
    Network(String),

    // User directory errors
    #[error("Directory lookup failed: {0}")]
    Directory(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid_config(key: &str, message: impl Into<String>) -> Self {
        AppError::InvalidConfig {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn feed_fetch(url: &str, message: impl Into<String>) -> Self {
        AppError::FeedFetch {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Errors that abort a whole run rather than degrading one branch of it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::MissingConfig(_) | AppError::InvalidConfig { .. } | AppError::Directory(_)
        )
    }
}

/// Convert network/reqwest errors. The URL is dropped because Telegram URLs
/// carry the bot token in their path.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_decode() {
            "invalid response body"
        } else {
            "request failed"
        };
        AppError::Network(match err.status() {
            Some(status) => format!("{kind} (HTTP {status})"),
            None => kind.to_string(),
        })
    }
}

/// Convert feed parsing errors
impl From<feed_rs::parser::ParseFeedError> for AppError {
    fn from(err: feed_rs::parser::ParseFeedError) -> Self {
        AppError::FeedParse(err.to_string())
    }
}
