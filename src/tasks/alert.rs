use super::BriefingService;
use crate::errors::AppResult;
use crate::telegram::types::TelegramUser;
use crate::types::Dialect;
use tracing::{error, info};

/// Send `message` (HTML) to the user `user_id`. Returns whether it was
/// delivered; the reason for a failure is logged.
pub async fn send_alert(service: &BriefingService, user_id: &str, message: &str) -> AppResult<bool> {
    let endpoint = match service.directory().recipient_by_owner_id(user_id).await? {
        Some(endpoint) => endpoint,
        None => {
            error!(user_id, "User not found or missing Telegram settings");
            return Ok(false);
        }
    };

    let outcome = service.telegram().deliver(&endpoint, message, Dialect::Html).await;
    if outcome.success {
        info!(user_id, "Alert sent");
    } else {
        error!(
            user_id,
            error = outcome.error.as_deref().unwrap_or("unknown error"),
            "Failed to send alert"
        );
    }
    Ok(outcome.success)
}

/// The bot a user's stored token belongs to, or `None` when the user has no
/// Telegram settings.
pub async fn check_recipient(service: &BriefingService, user_id: &str) -> AppResult<Option<TelegramUser>> {
    let endpoint = match service.directory().recipient_by_owner_id(user_id).await? {
        Some(endpoint) => endpoint,
        None => return Ok(None),
    };
    let bot = service.telegram().get_me(&endpoint.auth_token).await?;
    info!(user_id, bot = bot.username.as_deref().unwrap_or(&bot.first_name), "Token is valid");
    Ok(Some(bot))
}
