// src/render/mod.rs
//! Static site output: directory layout, handlebars pages, robots.txt and assets.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use handlebars::{handlebars_helper, Handlebars};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::ingest::types::Post;

/// Posts listed on the index page.
pub const INDEX_CAP: usize = 50;
/// Posts that get their own page.
pub const DETAIL_CAP: usize = 200;
// Every post linked from the index must also have a page.
const _: () = assert!(INDEX_CAP <= DETAIL_CAP);

pub const ROBOTS_TXT: &str = "User-agent: *\nAllow: /\n";

pub const INDEX_TEMPLATE: &str = "index";
pub const POST_TEMPLATE: &str = "post";
const INDEX_FILE: &str = "index.html";
const POST_FILE: &str = "post.html";

handlebars_helper!(date: |ts: String| format_date(&ts));

/// RFC 3339 -> `2024-03-01 10:00 UTC`; anything else passes through untouched.
pub fn format_date(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub posts: PathBuf,
    pub assets: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            posts: root.join("posts"),
            assets: root.join("assets"),
            root,
        }
    }

    /// Create-if-absent; safe to call on an existing tree.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.root, &self.posts, &self.assets] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating output dir {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn post_path(&self, post: &Post) -> PathBuf {
        self.posts.join(format!("{}.html", post.slug))
    }
}

#[derive(Serialize)]
struct IndexContext<'a> {
    site_title: &'a str,
    site_description: &'a str,
    generated_at: DateTime<Utc>,
    posts: &'a [Post],
    base_url: &'a str,
}

#[derive(Serialize)]
struct PostContext<'a> {
    site_title: &'a str,
    post: &'a Post,
    base_url: &'a str,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub index_posts: usize,
    pub post_pages: usize,
    pub assets_copied: usize,
}

pub struct SiteRenderer {
    registry: Handlebars<'static>,
}

impl SiteRenderer {
    fn registry() -> Handlebars<'static> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(true);
        hb.register_helper("date", Box::new(date));
        hb
    }

    /// Load `index.html` and `post.html` from a templates directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::registry();
        for (name, file) in [(INDEX_TEMPLATE, INDEX_FILE), (POST_TEMPLATE, POST_FILE)] {
            let path = dir.join(file);
            registry
                .register_template_file(name, &path)
                .with_context(|| format!("loading template {}", path.display()))?;
        }
        Ok(Self { registry })
    }

    pub fn from_strings(index: &str, post: &str) -> Result<Self> {
        let mut registry = Self::registry();
        registry
            .register_template_string(INDEX_TEMPLATE, index)
            .context("compiling index template")?;
        registry
            .register_template_string(POST_TEMPLATE, post)
            .context("compiling post template")?;
        Ok(Self { registry })
    }

    pub fn render_index(
        &self,
        cfg: &SiteConfig,
        posts: &[Post],
        generated_at: DateTime<Utc>,
    ) -> Result<String> {
        let ctx = IndexContext {
            site_title: &cfg.site_title,
            site_description: &cfg.site_description,
            generated_at,
            posts: &posts[..posts.len().min(INDEX_CAP)],
            base_url: cfg.base_url(),
        };
        self.registry
            .render(INDEX_TEMPLATE, &ctx)
            .context("rendering index")
    }

    pub fn render_post(&self, cfg: &SiteConfig, post: &Post) -> Result<String> {
        let ctx = PostContext {
            site_title: &cfg.site_title,
            post,
            base_url: cfg.base_url(),
        };
        self.registry
            .render(POST_TEMPLATE, &ctx)
            .with_context(|| format!("rendering post {}", post.slug))
    }

    /// Write the whole output tree for already-sorted `posts`.
    pub fn render_site(
        &self,
        cfg: &SiteConfig,
        posts: &[Post],
        generated_at: DateTime<Utc>,
    ) -> Result<RenderReport> {
        let layout = OutputLayout::new(&cfg.output_dir);
        layout.ensure()?;

        let index = self.render_index(cfg, posts, generated_at)?;
        write_file(&layout.root.join(INDEX_FILE), &index)?;

        let detail = &posts[..posts.len().min(DETAIL_CAP)];
        for post in detail {
            let html = self.render_post(cfg, post)?;
            write_file(&layout.post_path(post), &html)?;
        }

        write_robots(&layout.root)?;
        let assets_copied = copy_assets(&cfg.assets_dir, &layout.assets)?;

        let report = RenderReport {
            index_posts: posts.len().min(INDEX_CAP),
            post_pages: detail.len(),
            assets_copied,
        };
        tracing::info!(
            target: "render",
            index_posts = report.index_posts,
            post_pages = report.post_pages,
            assets = report.assets_copied,
            out = %layout.root.display(),
            "site rendered"
        );
        Ok(report)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

pub fn write_robots(root: &Path) -> Result<()> {
    write_file(&root.join("robots.txt"), ROBOTS_TXT)
}

/// Mirror every file under `src` into `dst`, keeping relative paths.
/// A missing `src` copies nothing.
pub fn copy_assets(src: &Path, dst: &Path) -> Result<usize> {
    if !src.is_dir() {
        tracing::debug!(target: "render", src = %src.display(), "no assets dir, skipping");
        return Ok(0);
    }
    let mut count = 0;
    copy_dir_recursive(src, dst, &mut count)?;
    Ok(count)
}

fn copy_dir_recursive(src_dir: &Path, dest_dir: &Path, count: &mut usize) -> Result<()> {
    let entries =
        fs::read_dir(src_dir).with_context(|| format!("listing {}", src_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest_dir.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dest_path, count)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&src_path, &dest_path).with_context(|| {
            format!("copying {} -> {}", src_path.display(), dest_path.display())
        })?;
        *count += 1;
    }
    Ok(())
}
