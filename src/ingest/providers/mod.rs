// src/ingest/providers/mod.rs
pub mod fixture;
pub mod http;
pub mod xml;

pub use fixture::FixtureFeedSource;
pub use http::HttpFeedSource;
