use crate::errors::{AppError, AppResult};
use crate::types::FeedSource;
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TELEGRAM_API_BASE_URL: &str = "https://api.telegram.org";

/// Feeds used when `BRIEFING_FEEDS` is not set. Order is display order.
pub fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "🇺🇸 미국 증시",
            "https://news.google.com/rss/search?q=US+Stock+Market&hl=en-US&gl=US&ceid=US:en",
        ),
        FeedSource::new(
            "🇰🇷 한국 증시",
            "https://news.google.com/rss/search?q=%EC%A3%BC%EC%8B%9D%EC%8B%9C%EC%9E%A5&hl=ko&gl=KR&ceid=KR:ko",
        ),
        FeedSource::new(
            "🪙 비트코인",
            "https://news.google.com/rss/search?q=Bitcoin&hl=en-US&gl=US&ceid=US:en",
        ),
    ]
}

/// Knobs for building a digest. Passed to the aggregator at call time.
#[derive(Debug, Clone)]
pub struct DigestSettings {
    /// Items shown per feed section.
    pub items_per_feed: usize,
    /// Accepted candidates after which a feed stops being scanned.
    pub candidate_pool: usize,
    /// Jaccard score above which two headlines count as the same story.
    pub similarity_threshold: f64,
    /// Drop headlines already shown in an earlier section.
    pub dedupe_across_feeds: bool,
    /// Timezone of the generation timestamp.
    pub timezone: Tz,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            items_per_feed: 3,
            candidate_pool: 10,
            similarity_threshold: 0.4,
            dedupe_across_feeds: false,
            timezone: chrono_tz::Asia::Seoul,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily briefing.
    pub time: NaiveTime,
    pub timezone: Tz,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            timezone: chrono_tz::Asia::Seoul,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub directory: DirectoryConfig,
    pub telegram_api_base_url: String,
    pub http_timeout: Duration,
    pub feeds: Vec<FeedSource>,
    pub digest: DigestSettings,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| AppError::MissingConfig(key.to_string()));

        let directory_url = require("SUPABASE_URL")?;
        Url::parse(&directory_url)
            .map_err(|e| AppError::invalid_config("SUPABASE_URL", e.to_string()))?;
        let service_key = require("SUPABASE_SERVICE_ROLE_KEY")?;
        tracing::info!("Using user directory at {}", directory_url);

        let telegram_api_base_url = match get("TELEGRAM_API_BASE_URL") {
            Some(url) => {
                Url::parse(&url)
                    .map_err(|e| AppError::invalid_config("TELEGRAM_API_BASE_URL", e.to_string()))?;
                tracing::info!("Using Telegram API base URL from TELEGRAM_API_BASE_URL: {}", url);
                url.trim_end_matches('/').to_string()
            }
            None => DEFAULT_TELEGRAM_API_BASE_URL.to_string(),
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| {
                        AppError::invalid_config("HTTP_TIMEOUT_SECS", "expected a positive number of seconds")
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(15),
        };
        tracing::info!("Using HTTP timeout of {}s", http_timeout.as_secs());

        let timezone = match get("BRIEFING_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|e| AppError::invalid_config("BRIEFING_TIMEZONE", e.to_string()))?,
            None => chrono_tz::Asia::Seoul,
        };

        let time = match get("BRIEFING_TIME") {
            Some(raw) => parse_briefing_time(&raw)?,
            None => ScheduleConfig::default().time,
        };
        tracing::info!("Daily briefing scheduled at {} {}", time.format("%H:%M"), timezone);

        let feeds = match get("BRIEFING_FEEDS") {
            Some(raw) => {
                let feeds = parse_feeds(&raw)?;
                tracing::info!("Using {} feeds from BRIEFING_FEEDS", feeds.len());
                feeds
            }
            None => default_feeds(),
        };

        let mut digest = DigestSettings {
            timezone,
            ..Default::default()
        };
        if let Some(raw) = get("BRIEFING_ITEMS_PER_FEED") {
            digest.items_per_feed = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    AppError::invalid_config("BRIEFING_ITEMS_PER_FEED", "expected a positive integer")
                })?;
        }
        if let Some(raw) = get("BRIEFING_DEDUPE_ACROSS_FEEDS") {
            digest.dedupe_across_feeds = parse_flag("BRIEFING_DEDUPE_ACROSS_FEEDS", &raw)?;
        }

        Ok(Self {
            directory: DirectoryConfig {
                url: directory_url.trim_end_matches('/').to_string(),
                service_key,
            },
            telegram_api_base_url,
            http_timeout,
            feeds,
            digest,
            schedule: ScheduleConfig { time, timezone },
        })
    }
}

fn parse_briefing_time(raw: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| AppError::invalid_config("BRIEFING_TIME", "expected HH:MM"))
}

fn parse_flag(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::invalid_config(key, "expected true or false")),
    }
}

fn parse_feeds(raw: &str) -> AppResult<Vec<FeedSource>> {
    let feeds: Vec<FeedSource> = serde_json::from_str(raw)
        .map_err(|e| AppError::invalid_config("BRIEFING_FEEDS", e.to_string()))?;
    if feeds.is_empty() {
        return Err(AppError::invalid_config("BRIEFING_FEEDS", "at least one feed is required"));
    }
    for feed in &feeds {
        let url = Url::parse(&feed.url)
            .map_err(|e| AppError::invalid_config("BRIEFING_FEEDS", format!("{}: {}", feed.url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AppError::invalid_config(
                "BRIEFING_FEEDS",
                format!("{}: only http(s) feeds are supported", feed.url),
            ));
        }
    }
    Ok(feeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SUPABASE_URL", "https://project.supabase.co/"),
        ("SUPABASE_SERVICE_ROLE_KEY", "service-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.directory.url, "https://project.supabase.co");
        assert_eq!(config.telegram_api_base_url, DEFAULT_TELEGRAM_API_BASE_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.feeds, default_feeds());
        assert_eq!(config.digest.items_per_feed, 3);
        assert_eq!(config.digest.candidate_pool, 10);
        assert_eq!(config.digest.similarity_threshold, 0.4);
        assert!(!config.digest.dedupe_across_feeds);
        assert_eq!(config.schedule.time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(config.schedule.timezone, chrono_tz::Asia::Seoul);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("SUPABASE_URL", "https://x.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, AppError::MissingConfig(ref key) if key == "SUPABASE_SERVICE_ROLE_KEY"));
        assert!(err.is_fatal());

        let err = AppConfig::from_lookup(lookup(&[
            ("SUPABASE_URL", "  "),
            ("SUPABASE_SERVICE_ROLE_KEY", "k"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::MissingConfig(ref key) if key == "SUPABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("TELEGRAM_API_BASE_URL", "http://localhost:8081/"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("BRIEFING_TIME", "07:30"),
            ("BRIEFING_TIMEZONE", "America/New_York"),
            ("BRIEFING_ITEMS_PER_FEED", "5"),
            ("BRIEFING_DEDUPE_ACROSS_FEEDS", "true"),
            ("BRIEFING_FEEDS", r#"[{"label": "Tech", "url": "https://example.com/tech.xml"}]"#),
        ]);
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.telegram_api_base_url, "http://localhost:8081");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.schedule.time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(config.schedule.timezone, chrono_tz::America::New_York);
        assert_eq!(config.digest.timezone, chrono_tz::America::New_York);
        assert_eq!(config.digest.items_per_feed, 5);
        assert!(config.digest.dedupe_across_feeds);
        assert_eq!(config.feeds, vec![FeedSource::new("Tech", "https://example.com/tech.xml")]);
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("BRIEFING_TIME", "8am"),
            ("BRIEFING_TIMEZONE", "Mars/Olympus"),
            ("HTTP_TIMEOUT_SECS", "0"),
            ("BRIEFING_ITEMS_PER_FEED", "-1"),
            ("BRIEFING_DEDUPE_ACROSS_FEEDS", "maybe"),
            ("BRIEFING_FEEDS", "[]"),
            ("BRIEFING_FEEDS", r#"[{"label": "x", "url": "ftp://example.com/feed"}]"#),
            ("BRIEFING_FEEDS", "not json"),
        ];
        for (key, value) in cases {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, value));
            let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidConfig { key: ref k, .. } if k == key),
                "{key}={value} gave {err:?}"
            );
        }
    }
}
