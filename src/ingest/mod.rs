// src/ingest/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

use crate::ingest::normalize::normalize_entry;
use crate::ingest::types::{FeedSource, Post};
use chrono::Utc;
use once_cell::sync::OnceCell;

pub const DEFAULT_MAX_ITEMS_PER_FEED: usize = 15;

/// Clean an HTML or text body into one line of plain text.
pub fn clean_summary(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Strip HTML tags (each tag becomes a space so words don't glue together)
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"<[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Feed display title: trimmed and entity-decoded, or the address when the feed has none.
pub fn feed_display_title(title: Option<&str>, address: &str) -> String {
    let raw = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(address);
    html_escape::decode_html_entities(raw).trim().to_string()
}

/// Most recent first. Stable, so equal timestamps keep feed/entry order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.published.cmp(&a.published));
}

#[derive(Debug, Default)]
pub struct AggregateReport {
    pub posts: Vec<Post>,
    pub feeds_ok: usize,
    pub feeds_empty: usize,
    pub feeds_failed: usize,
}

/// Fetch every feed in order, normalize up to `max_items` entries each and
/// return all posts sorted newest first.
///
/// A feed that cannot be fetched or parsed is logged and skipped; it never
/// aborts the run.
pub async fn aggregate(
    source: &dyn FeedSource,
    feeds: &[String],
    max_items: usize,
) -> AggregateReport {
    let mut report = AggregateReport::default();

    for address in feeds {
        let feed = match source.fetch(address).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    feed = %address,
                    source = source.name(),
                    error = ?e,
                    "feed fetch failed, skipping"
                );
                report.feeds_failed += 1;
                continue;
            }
        };

        let source_title = feed_display_title(feed.title.as_deref(), address);

        if let Some(anomaly) = &feed.anomaly {
            tracing::warn!(target: "ingest", feed = %address, %anomaly, "feed parse issue");
        }

        let now = Utc::now();
        let before = report.posts.len();
        report.posts.extend(
            feed.entries
                .iter()
                .take(max_items)
                .filter_map(|entry| normalize_entry(entry, &source_title, now)),
        );
        let kept = report.posts.len() - before;

        if kept == 0 {
            tracing::warn!(target: "ingest", feed = %address, "no entries");
            report.feeds_empty += 1;
            continue;
        }

        tracing::debug!(target: "ingest", feed = %address, source = %source_title, kept, "feed ingested");
        report.feeds_ok += 1;
    }

    sort_newest_first(&mut report.posts);
    report
}
