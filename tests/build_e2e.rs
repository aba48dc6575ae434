// tests/build_e2e.rs
use rss_digest::ingest::providers::HttpFeedSource;
use rss_digest::{run_build, SiteConfig, SiteRenderer};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[tokio::test]
async fn build_from_local_feed_files_writes_the_site() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    let fixtures = manifest.join("tests/fixtures");
    let tmp = tempfile::tempdir().unwrap();

    let cfg = SiteConfig {
        feeds: vec![
            fixtures.join("rss2.xml").display().to_string(),
            format!("file://{}", fixtures.join("atom.xml").display()),
            fixtures.join("does-not-exist.xml").display().to_string(),
        ],
        output_dir: tmp.path().join("dist"),
        templates_dir: manifest.join("templates"),
        assets_dir: manifest.join("assets"),
        ..SiteConfig::default()
    };

    let renderer = SiteRenderer::from_dir(&cfg.templates_dir).unwrap();
    let source = HttpFeedSource::new(Duration::from_secs(5), &cfg.user_agent).unwrap();
    let report = run_build(&cfg, &source, &renderer).await.unwrap();

    assert_eq!(report.posts_total, 5);
    assert_eq!(report.feeds_ok, 2);
    assert_eq!(report.feeds_failed, 1);
    assert_eq!(report.render.post_pages, 5);
    assert!(report.render.assets_copied >= 1);

    let dist = tmp.path().join("dist");
    let index = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(index.contains("Hello, World! 2024"));
    assert!(index.contains("Atom &amp; Entities"));
    assert!(dist.join("posts/hello-world-2024-3257245595.html").exists());
    assert!(dist.join("assets/style.css").exists());
    assert!(dist.join("robots.txt").exists());
}
