use super::types::{TelegramMessage, TelegramResponse, TelegramUser};
use crate::errors::{AppError, AppResult};
use crate::types::{DeliveryOutcome, Dialect, RecipientEndpoint};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Telegram rejects longer message texts.
pub const MAX_MESSAGE_CHARS: usize = 4096;
const TRUNCATION_MARKER: &str = "\n… (truncated)";

/// Bot API client. Holds no credentials: each call uses the token of the
/// recipient it is addressed to.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_base_url: String,
}

impl TelegramClient {
    pub fn new(client: Client, api_base_url: &str) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base_url, token, method)
    }

    /// Send `text` to one recipient. Never fails: any problem is reported in
    /// the returned outcome.
    pub async fn deliver(
        &self,
        endpoint: &RecipientEndpoint,
        text: &str,
        dialect: Dialect,
    ) -> DeliveryOutcome {
        match self.send_message(endpoint, text, dialect).await {
            Ok(()) => {
                debug!(chat_id = %endpoint.chat_id, "Telegram message sent");
                DeliveryOutcome::delivered(&endpoint.chat_id)
            }
            Err(e) => DeliveryOutcome::failed(&endpoint.chat_id, e.to_string()),
        }
    }

    pub async fn send_message(
        &self,
        endpoint: &RecipientEndpoint,
        text: &str,
        dialect: Dialect,
    ) -> AppResult<()> {
        let message = TelegramMessage {
            chat_id: endpoint.chat_id.clone(),
            text: clip_message(text, dialect),
            parse_mode: Some(dialect.parse_mode().to_string()),
            disable_web_page_preview: Some(true),
        };

        let response = self
            .client
            .post(self.method_url(&endpoint.auth_token, "sendMessage"))
            .json(&message)
            .send()
            .await?;

        self.read_response::<serde_json::Value>(response).await.map(|_| ())
    }

    /// The bot behind `token`, to check a recipient's credentials.
    pub async fn get_me(&self, token: &str) -> AppResult<TelegramUser> {
        let response = self.client.get(self.method_url(token, "getMe")).send().await?;
        self.read_response::<TelegramUser>(response)
            .await?
            .ok_or_else(|| AppError::Delivery("No result in Telegram response".to_string()))
    }

    async fn read_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> AppResult<Option<T>> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<TelegramResponse<T>>(&body) {
            Ok(parsed) if status.is_success() && parsed.ok => Ok(parsed.result),
            Ok(parsed) => Err(AppError::Delivery(
                parsed
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| format!("Telegram API error (HTTP {status})")),
            )),
            Err(_) if status.is_success() => Err(AppError::Delivery(
                "Unreadable response from Telegram".to_string(),
            )),
            Err(_) => Err(AppError::Delivery(format!("Telegram API error (HTTP {status})"))),
        }
    }
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static MARKDOWN_LINK_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\([^)]*\)").expect("link pattern is valid"));

/// Length of `text` as Telegram counts it: after markup is parsed, so tags,
/// entity escapes and link targets do not count.
pub fn visible_len(text: &str, dialect: Dialect) -> usize {
    match dialect {
        Dialect::Html => {
            let stripped = HTML_TAG.replace_all(text, "");
            html_escape::decode_html_entities(&stripped).chars().count()
        }
        Dialect::Markdown => MARKDOWN_LINK_TARGET.replace_all(text, "]").chars().count(),
    }
}

/// Keep `text` within Telegram's length limit, dropping whole lines from the
/// end so markup stays balanced.
pub fn clip_message(text: &str, dialect: Dialect) -> String {
    if visible_len(text, dialect) <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }

    let budget = MAX_MESSAGE_CHARS - TRUNCATION_MARKER.chars().count();
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0;
    for line in text.split('\n') {
        let cost = visible_len(line, dialect) + usize::from(!kept.is_empty());
        if used + cost > budget {
            break;
        }
        used += cost;
        kept.push(line);
    }

    if kept.is_empty() {
        // first line alone is too long
        let head: String = text.chars().take(budget).collect();
        return format!("{head}{TRUNCATION_MARKER}");
    }
    format!("{}{TRUNCATION_MARKER}", kept.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(chat_id: &str, token: &str) -> RecipientEndpoint {
        RecipientEndpoint {
            chat_id: chat_id.to_string(),
            auth_token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_deliver_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot111:AAA/sendMessage"))
            .and(body_json(json!({
                "chat_id": "1001",
                "text": "<b>hello</b>",
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(Client::new(), &server.uri());
        let outcome = client
            .deliver(&endpoint("1001", "111:AAA"), "<b>hello</b>", Dialect::Html)
            .await;
        assert_eq!(outcome, DeliveryOutcome::delivered("1001"));
    }

    #[tokio::test]
    async fn test_deliver_maps_provider_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botbad/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "x"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(Client::new(), &server.uri());
        let outcome = client.deliver(&endpoint("1001", "bad"), "hi", Dialect::Markdown).await;
        assert_eq!(outcome, DeliveryOutcome::failed("1001", "x"));
    }

    #[tokio::test]
    async fn test_deliver_ok_false_with_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
            .mount(&server)
            .await;

        let client = TelegramClient::new(Client::new(), &server.uri());
        let outcome = client.deliver(&endpoint("5", "t"), "hi", Dialect::Html).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Telegram API error (HTTP 200 OK)"));
    }

    #[tokio::test]
    async fn test_deliver_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let client = TelegramClient::new(Client::new(), &server.uri());
        let outcome = client.deliver(&endpoint("5", "t"), "hi", Dialect::Html).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("502"));
    }

    #[tokio::test]
    async fn test_deliver_transport_error() {
        let client = TelegramClient::new(Client::new(), "http://127.0.0.1:9");
        let outcome = client.deliver(&endpoint("5", "secret-token"), "hi", Dialect::Html).await;
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.starts_with("Network error"));
        assert!(!error.contains("secret-token"));
    }

    #[tokio::test]
    async fn test_get_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot111:AAA/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"id": 111, "is_bot": true, "first_name": "Briefing", "username": "briefing_bot"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/botnope/getMe"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(Client::new(), &server.uri());
        let me = client.get_me("111:AAA").await.unwrap();
        assert_eq!(me.username.as_deref(), Some("briefing_bot"));
        assert!(me.is_bot);

        let err = client.get_me("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn test_clip_message() {
        assert_eq!(clip_message("short", Dialect::Html), "short");

        let line = "가".repeat(99);
        let text = vec![line.as_str(); 60].join("\n");
        assert!(text.chars().count() > MAX_MESSAGE_CHARS);

        let clipped = clip_message(&text, Dialect::Html);
        assert!(clipped.chars().count() <= MAX_MESSAGE_CHARS);
        assert!(clipped.ends_with(TRUNCATION_MARKER));
        let body = clipped.trim_end_matches(TRUNCATION_MARKER);
        assert!(body.split('\n').all(|l| l == line));
    }

    #[test]
    fn test_visible_len_ignores_markup() {
        let html = "<b>S&amp;P</b> <a href=\"https://n.example.com/a?x=1&amp;y=2\">up</a>";
        assert_eq!(visible_len(html, Dialect::Html), "S&P up".chars().count());
        assert_eq!(visible_len("*Crypto*\n- [BTC](https://n.example.com/b)", Dialect::Markdown), 16);
    }

    #[test]
    fn test_long_links_do_not_trigger_clipping() {
        use crate::news::digest::{render_digest, DigestSection};
        use crate::types::NewsItem;
        use chrono::TimeZone;

        let long_link = format!("https://news.google.com/rss/articles/{}?oc=5", "C".repeat(450));
        let sections: Vec<DigestSection> = ["🇺🇸 미국 증시", "🇰🇷 한국 증시", "🪙 비트코인"]
            .iter()
            .map(|label| DigestSection {
                label: label.to_string(),
                items: (0..3)
                    .map(|i| NewsItem {
                        title: format!("{label} headline {i}"),
                        link: long_link.clone(),
                    })
                    .collect(),
            })
            .collect();
        let at = chrono_tz::Asia::Seoul
            .with_ymd_and_hms(2026, 10, 19, 8, 0, 0)
            .single()
            .unwrap();
        let html = render_digest(&sections, Dialect::Html, &at);
        assert!(html.chars().count() > MAX_MESSAGE_CHARS);

        let clipped = clip_message(&html, Dialect::Html);
        assert_eq!(clipped, html);
        assert!(clipped.contains("🪙 비트코인 headline 2"));
        assert!(clipped.contains("⏰ 2026. 10. 19. 오전 8:00:00"));
    }

    #[test]
    fn test_clip_counts_visible_html_text() {
        let line = format!("<b>{}</b>", "가".repeat(99));
        let text = vec![line.as_str(); 60].join("\n");

        let clipped = clip_message(&text, Dialect::Html);
        assert!(clipped.ends_with(TRUNCATION_MARKER));
        assert!(visible_len(&clipped, Dialect::Html) <= MAX_MESSAGE_CHARS);
        let body = clipped.trim_end_matches(TRUNCATION_MARKER);
        assert_eq!(body.split('\n').count(), 40);
        assert!(body.split('\n').all(|l| l == line));
    }
}
