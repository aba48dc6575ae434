// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One feed entry exactly as the parser found it. Nothing is trimmed or decoded yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedFeed {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
    /// Set when the document only parsed after repair (feedparser's "bozo").
    pub anomaly: Option<String>,
}

/// Normalized post record handed to the templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published: DateTime<Utc>, // always UTC
    pub summary: String,
    pub slug: String,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, address: &str) -> Result<FetchedFeed>;
    fn name(&self) -> &'static str;
}
