// src/ingest/providers/fixture.rs
use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::ingest::providers::xml::parse_feed;
use crate::ingest::types::{FeedSource, FetchedFeed};

enum Fixture {
    Document(String),
    Parsed(FetchedFeed),
    Failure(String),
}

/// In-memory source keyed by feed address. Used by tests and dry runs.
#[derive(Default)]
pub struct FixtureFeedSource {
    feeds: HashMap<String, Fixture>,
}

impl FixtureFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw XML that goes through the real parser on fetch.
    pub fn with_document(mut self, address: &str, xml: &str) -> Self {
        self.feeds
            .insert(address.to_string(), Fixture::Document(xml.to_string()));
        self
    }

    pub fn with_feed(mut self, address: &str, feed: FetchedFeed) -> Self {
        self.feeds.insert(address.to_string(), Fixture::Parsed(feed));
        self
    }

    /// Fetching `address` fails with `message`, like an unreachable host would.
    pub fn with_failure(mut self, address: &str, message: &str) -> Self {
        self.feeds
            .insert(address.to_string(), Fixture::Failure(message.to_string()));
        self
    }
}

#[async_trait]
impl FeedSource for FixtureFeedSource {
    async fn fetch(&self, address: &str) -> Result<FetchedFeed> {
        match self.feeds.get(address) {
            Some(Fixture::Document(xml)) => {
                parse_feed(xml).with_context(|| format!("parsing fixture {address}"))
            }
            Some(Fixture::Parsed(feed)) => Ok(feed.clone()),
            Some(Fixture::Failure(msg)) => Err(anyhow!("{msg}")),
            None => Err(anyhow!("no fixture registered for {address}")),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
