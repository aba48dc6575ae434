//! Digest builder binary entrypoint.
//! Loads the site config, pulls every feed, and renders the static site.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rss_digest::ingest::providers::HttpFeedSource;
use rss_digest::{run_build, SiteConfig, SiteRenderer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the static RSS digest site
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default: $DIGEST_CONFIG_PATH, then site.config.json, then site.config.toml)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Output directory, overrides `output_dir` from the config
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    output: Option<PathBuf>,
}

fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    enable_tracing();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => SiteConfig::load_from_file(path)?,
        None => SiteConfig::load_default()?,
    };
    if let Some(out) = cli.output {
        cfg.output_dir = out;
    }

    // Templates first: a broken template should fail before any network work.
    let renderer = SiteRenderer::from_dir(&cfg.templates_dir)?;
    let source = HttpFeedSource::new(cfg.fetch_timeout(), &cfg.user_agent)
        .context("initializing feed source")?;

    let report = run_build(&cfg, &source, &renderer).await?;

    println!(
        "[OK] Built {} posts -> {}/",
        report.posts_total,
        cfg.output_dir.display()
    );
    Ok(())
}
