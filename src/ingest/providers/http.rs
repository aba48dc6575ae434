// src/ingest/providers/http.rs
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::ingest::providers::xml::parse_feed_bytes;
use crate::ingest::types::{FeedSource, FetchedFeed};

/// Production source: `http(s)://` addresses go over the network, anything
/// else is read from disk (an optional `file://` prefix is stripped).
pub struct HttpFeedSource {
    client: reqwest::Client,
}

enum Location<'a> {
    Remote(&'a str),
    Local(PathBuf),
}

fn locate(address: &str) -> Location<'_> {
    let lower = address.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Location::Remote(address)
    } else {
        Location::Local(PathBuf::from(
            address.strip_prefix("file://").unwrap_or(address),
        ))
    }
}

impl HttpFeedSource {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }

    async fn read_body(&self, address: &str) -> Result<Vec<u8>> {
        match locate(address) {
            Location::Remote(url) => {
                let resp = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("GET {url} returned {status}");
                }
                let body = resp
                    .bytes()
                    .await
                    .with_context(|| format!("reading body of {url}"))?;
                Ok(body.to_vec())
            }
            Location::Local(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading feed file {}", path.display())),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, address: &str) -> Result<FetchedFeed> {
        let body = self.read_body(address).await?;
        parse_feed_bytes(&body).with_context(|| format!("parsing feed {address}"))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
