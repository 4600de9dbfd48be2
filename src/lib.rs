pub mod config;
pub mod directory;
pub mod errors;
pub mod http;
pub mod news;
pub mod observability;
pub mod tasks;
pub mod telegram;
pub mod types;

pub use errors::{AppError, AppResult};
pub use types::{DeliveryOutcome, Dialect, FeedSource, NewsItem, Recipient, RecipientEndpoint};
