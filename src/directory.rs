//! Where recipients and their Telegram credentials come from.

use crate::config::DirectoryConfig;
use crate::errors::{AppError, AppResult};
use crate::types::{Recipient, RecipientEndpoint};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Lookup of users who receive Telegram messages.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every user with both a chat id and a bot token.
    async fn opted_in_recipients(&self) -> AppResult<Vec<Recipient>>;

    /// The endpoint of one user, or `None` if the user does not exist or has
    /// incomplete Telegram settings.
    async fn recipient_by_owner_id(&self, owner_id: &str) -> AppResult<Option<RecipientEndpoint>>;
}

/// A row of the `users` table, restricted to the columns we select.
#[derive(Debug, Deserialize)]
struct UserRow {
    id: serde_json::Value,
    telegram_id: Option<serde_json::Value>,
    telegram_token: Option<String>,
}

impl UserRow {
    fn into_recipient(self) -> Option<Recipient> {
        let chat_id = match self.telegram_id? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let auth_token = self.telegram_token?;
        if chat_id.trim().is_empty() || auth_token.trim().is_empty() {
            return None;
        }
        let owner_id = match self.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Some(Recipient {
            owner_id,
            endpoint: RecipientEndpoint {
                chat_id: chat_id.trim().to_string(),
                auth_token: auth_token.trim().to_string(),
            },
        })
    }
}

const USER_COLUMNS: &str = "id,telegram_id,telegram_token";

/// The `users` table of a Supabase project, read through its REST API with
/// the service role key.
pub struct SupabaseDirectory {
    client: Client,
    config: DirectoryConfig,
}

impl SupabaseDirectory {
    pub fn new(client: Client, config: DirectoryConfig) -> Self {
        Self { client, config }
    }

    fn users_url(&self) -> String {
        format!("{}/rest/v1/users", self.config.url.trim_end_matches('/'))
    }

    async fn request_users(&self, filters: &[(&str, &str)]) -> AppResult<Response> {
        let mut query: Vec<(&str, &str)> = vec![("select", USER_COLUMNS)];
        query.extend_from_slice(filters);

        self.client
            .get(self.users_url())
            .query(&query)
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Directory(AppError::from(e).to_string()))
    }

    async fn query_users(&self, filters: &[(&str, &str)]) -> AppResult<Vec<UserRow>> {
        let response = self.request_users(filters).await?;
        read_rows(response).await
    }
}

async fn read_rows(response: Response) -> AppResult<Vec<UserRow>> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));
        return Err(AppError::Directory(match detail {
            Some(message) => format!("HTTP {status}: {message}"),
            None => format!("HTTP {status}"),
        }));
    }

    response
        .json::<Vec<UserRow>>()
        .await
        .map_err(|e| AppError::Directory(format!("unexpected response: {e}")))
}

#[async_trait]
impl Directory for SupabaseDirectory {
    async fn opted_in_recipients(&self) -> AppResult<Vec<Recipient>> {
        let rows = self
            .query_users(&[
                ("telegram_id", "not.is.null"),
                ("telegram_token", "not.is.null"),
            ])
            .await?;
        let total = rows.len();
        let recipients: Vec<Recipient> = rows.into_iter().filter_map(UserRow::into_recipient).collect();
        debug!(rows = total, recipients = recipients.len(), "Loaded Telegram recipients");
        Ok(recipients)
    }

    async fn recipient_by_owner_id(&self, owner_id: &str) -> AppResult<Option<RecipientEndpoint>> {
        let filter = format!("eq.{owner_id}");
        let response = self
            .request_users(&[("id", filter.as_str()), ("limit", "1")])
            .await?;
        // PostgREST answers 400 when the id cannot be cast to the column type
        if response.status() == StatusCode::BAD_REQUEST {
            debug!(owner_id, "Directory rejected user id, treating it as unknown");
            return Ok(None);
        }
        let rows = read_rows(response).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(UserRow::into_recipient)
            .map(|r| r.endpoint))
    }
}
