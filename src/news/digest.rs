use crate::config::DigestSettings;
use crate::news::fetcher::FeedFetcher;
use crate::news::similarity::is_near_duplicate;
use crate::types::{Dialect, FeedSource, NewsItem};
use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use futures_util::future::join_all;
use tracing::info;

pub const DIGEST_TITLE: &str = "오늘의 시장 브리핑";
pub const NO_NEWS_PLACEHOLDER: &str = "관련 뉴스가 없습니다.";

/// One feed's part of a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
    pub label: String,
    pub items: Vec<NewsItem>,
}

/// Builds the market digest from a list of feeds.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: FeedFetcher,
}

impl Aggregator {
    pub fn new(fetcher: FeedFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch every source concurrently and render one section per source, in
    /// the order given.
    pub async fn build_digest(
        &self,
        sources: &[FeedSource],
        dialect: Dialect,
        settings: &DigestSettings,
    ) -> String {
        let sections = self.collect_sections(sources, settings).await;
        let generated_at = Utc::now().with_timezone(&settings.timezone);
        render_digest(&sections, dialect, &generated_at)
    }

    /// Deduplicated and capped items per source. A feed that fails to load
    /// gets an empty section.
    pub async fn collect_sections(
        &self,
        sources: &[FeedSource],
        settings: &DigestSettings,
    ) -> Vec<DigestSection> {
        // join_all keeps input order, whatever order the fetches finish in
        let pools = join_all(
            sources
                .iter()
                .map(|source| self.fetcher.fetch_candidates_or_empty(source, settings)),
        )
        .await;

        let mut shown: Vec<String> = Vec::new();
        let mut sections = Vec::with_capacity(sources.len());
        for (source, pool) in sources.iter().zip(pools) {
            let mut items = Vec::new();
            for item in pool {
                if items.len() >= settings.items_per_feed {
                    break;
                }
                if settings.dedupe_across_feeds
                    && shown
                        .iter()
                        .any(|seen| is_near_duplicate(seen, &item.title, settings.similarity_threshold))
                {
                    continue;
                }
                items.push(item);
            }
            shown.extend(items.iter().map(|i| i.title.clone()));
            sections.push(DigestSection {
                label: source.label.clone(),
                items,
            });
        }

        let empty = sections.iter().filter(|s| s.items.is_empty()).count();
        info!(feeds = sections.len(), empty, "Collected digest sections");
        sections
    }
}

/// Render sections in `dialect`. Only the HTML digest carries the
/// generation timestamp.
pub fn render_digest(sections: &[DigestSection], dialect: Dialect, generated_at: &DateTime<Tz>) -> String {
    match dialect {
        Dialect::Html => render_html(sections, generated_at),
        Dialect::Markdown => render_markdown(sections),
    }
}

fn render_html(sections: &[DigestSection], generated_at: &DateTime<Tz>) -> String {
    let mut message = format!("📢 <b>{DIGEST_TITLE}</b>\n\n");

    for section in sections {
        message.push_str(&format!("<b>{}</b>\n", html_escape::encode_text(&section.label)));
        if section.items.is_empty() {
            message.push_str(&format!("- {NO_NEWS_PLACEHOLDER}\n"));
        }
        for item in &section.items {
            let title = html_escape::encode_text(&item.title);
            if item.link.is_empty() {
                message.push_str(&format!("- {title}\n"));
            } else {
                message.push_str(&format!(
                    "- <a href=\"{}\">{}</a>\n",
                    html_escape::encode_double_quoted_attribute(&item.link),
                    title
                ));
            }
        }
        message.push('\n');
    }

    message.push_str(&format!("\n⏰ {}", korean_timestamp(generated_at)));
    message
}

fn render_markdown(sections: &[DigestSection]) -> String {
    let mut message = format!("📢 **{DIGEST_TITLE}**\n\n");

    for section in sections {
        message.push_str(&format!("*{}*\n", escape_markdown(&section.label)));
        if section.items.is_empty() {
            message.push_str(&format!("- {NO_NEWS_PLACEHOLDER}\n"));
        }
        for item in &section.items {
            let title = escape_markdown(&item.title);
            if item.link.is_empty() {
                message.push_str(&format!("- {title}\n"));
            } else {
                message.push_str(&format!("- [{}]({})\n", title, markdown_link_target(&item.link)));
            }
        }
        message.push('\n');
    }

    message
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Characters that end or split a `(...)` link target.
fn markdown_link_target(link: &str) -> String {
    link.replace(' ', "%20").replace('(', "%28").replace(')', "%29")
}

/// `2026. 10. 19. 오전 8:00:00`, the ko-KR date and time convention.
pub fn korean_timestamp(at: &DateTime<Tz>) -> String {
    let (pm, hour) = at.hour12();
    format!(
        "{}. {}. {}. {} {}:{:02}:{:02}",
        at.year(),
        at.month(),
        at.day(),
        if pm { "오후" } else { "오전" },
        hour,
        at.minute(),
        at.second()
    )
}
