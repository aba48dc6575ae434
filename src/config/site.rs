// src/config/site.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::DEFAULT_MAX_ITEMS_PER_FEED;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_JSON_PATH: &str = "site.config.json";
pub const DEFAULT_TOML_PATH: &str = "site.config.toml";
pub const DEFAULT_SITE_TITLE: &str = "One-Shot Lite RSS Digest";

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS_PER_FEED
}
fn default_site_title() -> String {
    DEFAULT_SITE_TITLE.to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}
fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}
fn default_fetch_timeout_secs() -> u64 {
    20
}
fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    /// Feed addresses, fetched in this order.
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default = "default_max_items")]
    pub max_items_per_feed: usize,
    #[serde(default = "default_site_title")]
    pub site_title: String,
    #[serde(default)]
    pub site_description: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            max_items_per_feed: default_max_items(),
            site_title: default_site_title(),
            site_description: String::new(),
            base_url: String::new(),
            output_dir: default_output_dir(),
            templates_dir: default_templates_dir(),
            assets_dir: default_assets_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SiteConfig {
    /// Load from an explicit path. `.toml` files are read as TOML, everything else as JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading site config from {}", path.display()))?;
        let is_toml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let cfg: SiteConfig = if is_toml {
            toml::from_str(&data)
                .with_context(|| format!("parsing TOML config {}", path.display()))?
        } else {
            serde_json::from_str(&data)
                .with_context(|| format!("parsing JSON config {}", path.display()))?
        };
        Ok(cfg)
    }

    /// Resolve the config path and load it:
    /// 1) $DIGEST_CONFIG_PATH
    /// 2) site.config.json
    /// 3) site.config.toml
    pub fn load_default() -> Result<Self> {
        Self::load_default_in(Path::new("."))
    }

    /// Same lookup as [`SiteConfig::load_default`], relative to `root`.
    pub fn load_default_in(root: &Path) -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            return Self::load_from_file(&pb);
        }
        let json_p = root.join(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from_file(&json_p);
        }
        let toml_p = root.join(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from_file(&toml_p);
        }
        Err(anyhow!(
            "no site config found (set {ENV_CONFIG_PATH} or create {DEFAULT_JSON_PATH})"
        ))
    }

    /// `base_url` without trailing slashes, ready for `{{base_url}}/posts/...`.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_fill_missing_fields() {
        let cfg: SiteConfig = serde_json::from_str(r#"{"feeds": ["https://a.test/rss"]}"#).unwrap();
        assert_eq!(cfg.feeds, vec!["https://a.test/rss".to_string()]);
        assert_eq!(cfg.max_items_per_feed, 15);
        assert_eq!(cfg.site_title, DEFAULT_SITE_TITLE);
        assert_eq!(cfg.base_url(), "");
        assert_eq!(cfg.output_dir, PathBuf::from("dist"));
    }

    #[test]
    fn base_url_strips_trailing_slashes() {
        let cfg = SiteConfig {
            base_url: "https://digest.test/sub//".into(),
            ..SiteConfig::default()
        };
        assert_eq!(cfg.base_url(), "https://digest.test/sub");
    }
}
