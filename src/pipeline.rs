// src/pipeline.rs
use anyhow::Result;
use chrono::Utc;

use crate::config::SiteConfig;
use crate::ingest::{self, types::FeedSource};
use crate::render::{RenderReport, SiteRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub posts_total: usize,
    pub feeds_ok: usize,
    pub feeds_empty: usize,
    pub feeds_failed: usize,
    pub render: RenderReport,
}

/// Fetch -> normalize -> sort -> render. Feeds are processed one at a time.
pub async fn run_build(
    cfg: &SiteConfig,
    source: &dyn FeedSource,
    renderer: &SiteRenderer,
) -> Result<BuildReport> {
    tracing::info!(feeds = cfg.feeds.len(), source = source.name(), "build started");

    let agg = ingest::aggregate(source, &cfg.feeds, cfg.max_items_per_feed).await;
    let render = renderer.render_site(cfg, &agg.posts, Utc::now())?;

    let report = BuildReport {
        posts_total: agg.posts.len(),
        feeds_ok: agg.feeds_ok,
        feeds_empty: agg.feeds_empty,
        feeds_failed: agg.feeds_failed,
        render,
    };
    tracing::info!(
        posts = report.posts_total,
        feeds_ok = report.feeds_ok,
        feeds_empty = report.feeds_empty,
        feeds_failed = report.feeds_failed,
        out = %cfg.output_dir.display(),
        "build finished"
    );
    Ok(report)
}
