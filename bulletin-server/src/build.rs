use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bulletin_core::{fetch_snapshot, ContentSource};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::server::SiteSettings;

/// What a `bulletin build` run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub sitemap_urls: usize,
    pub news_entries: Option<usize>,
    pub files: Vec<PathBuf>,
}

/// Fetch once and write the crawler files into `output`.
///
/// Both sitemaps come from the same snapshot. Nothing is written unless the
/// fetch succeeds.
#[instrument(skip(site, source, output), fields(output = %output.display()))]
pub async fn build_files(
    site: &SiteSettings,
    source: &dyn ContentSource,
    output: &Path,
    now: DateTime<Utc>,
) -> Result<BuildSummary> {
    let snapshot = fetch_snapshot(source, site.fetch_timeout)
        .await
        .context("failed to fetch sitemap content")?;
    let sitemap = site.assemble_sitemap(&snapshot, now);
    let news = site
        .news
        .enable
        .then(|| site.assemble_news(&snapshot.articles, now));

    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("failed to create {}", output.display()))?;

    let mut files = Vec::new();
    files.push(write(output, "sitemap.xml", &sitemap.to_xml()).await?);
    if let Some(news) = &news {
        files.push(write(output, "news-sitemap.xml", &news.to_xml()).await?);
    }
    files.push(write(output, "robots.txt", &site.robots_txt()).await?);

    let summary = BuildSummary {
        sitemap_urls: sitemap.len(),
        news_entries: news.as_ref().map(|n| n.entries().len()),
        files,
    };
    info!(
        urls = summary.sitemap_urls,
        news = ?summary.news_entries,
        "build complete"
    );
    Ok(summary)
}

async fn write(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    tokio::fs::write(&path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
