// src/lib.rs
// Public library surface for both binaries and the integration tests.

pub mod config;
pub mod guard;
pub mod ingest;
pub mod pipeline;
pub mod render;

// ---- Re-exports for stable public API ----
pub use crate::config::SiteConfig;
pub use crate::guard::{LockState, OneShotGuard};
pub use crate::ingest::types::{FeedSource, FetchedFeed, Post, RawEntry};
pub use crate::pipeline::{run_build, BuildReport};
pub use crate::render::SiteRenderer;
