//! Sitemap generation.
//!
//! Builds `sitemap.xml` from a snapshot of articles and categories plus the
//! compiled-in static page table.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://thebulletinbriefs.in</loc>
//!     <lastmod>2025-01-01</lastmod>
//!     <changefreq>daily</changefreq>
//!     <priority>1.0</priority>
//!   </url>
//! </urlset>
//! ```
//!
//! Entry order: homepage, static pages, categories, published articles, RSS feed.

use crate::config::{validate_static_pages, BaseUrl, ConfigError};
use crate::slug::normalize_slug;
use bulletin_types::{ArticleRecord, CategoryRecord, ChangeFrequency, Priority};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Protocol limit on `<url>` entries per document
pub const MAX_URLS: usize = 50_000;

const STATIC_PAGES: [(&str, ChangeFrequency); 8] = [
    ("/about", ChangeFrequency::Monthly),
    ("/contact", ChangeFrequency::Monthly),
    ("/editorial-guidelines", ChangeFrequency::Monthly),
    ("/subscription", ChangeFrequency::Weekly),
    ("/privacy", ChangeFrequency::Monthly),
    ("/terms", ChangeFrequency::Monthly),
    ("/cookies", ChangeFrequency::Monthly),
    ("/disclaimer", ChangeFrequency::Monthly),
];

/// A page that exists independent of the content store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPage {
    pub path: String,
    pub changefreq: ChangeFrequency,
}

pub fn default_static_pages() -> Vec<StaticPage> {
    STATIC_PAGES
        .iter()
        .map(|(path, changefreq)| StaticPage {
            path: (*path).to_string(),
            changefreq: *changefreq,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    pub loc: String,
    pub lastmod: NaiveDate,
    pub changefreq: ChangeFrequency,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    urls: Vec<UrlEntry>,
}

impl SitemapDocument {
    /// Lay out every entry in document order
    ///
    /// Unpublished articles are dropped even if the caller already filtered.
    /// Records with malformed or repeated slugs are skipped with a warning.
    pub fn assemble(
        base: &BaseUrl,
        articles: &[ArticleRecord],
        categories: &[CategoryRecord],
        static_pages: &[StaticPage],
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let mut urls = Vec::with_capacity(static_pages.len() + categories.len() + articles.len() + 2);

        urls.push(UrlEntry {
            loc: base.as_str().to_string(),
            lastmod: today,
            changefreq: ChangeFrequency::Daily,
            priority: Priority::HOME,
        });

        for page in static_pages {
            urls.push(UrlEntry {
                loc: base.join(&page.path),
                lastmod: today,
                changefreq: page.changefreq,
                priority: Priority::STATIC_PAGE,
            });
        }

        let mut seen_categories = HashSet::new();
        for category in categories {
            let slug = match normalize_slug(&category.slug) {
                Ok(slug) => slug,
                Err(err) => {
                    tracing::warn!(slug = %category.slug, %err, "skipping category with malformed slug");
                    continue;
                }
            };
            if !seen_categories.insert(slug) {
                tracing::warn!(%slug, "skipping duplicate category");
                continue;
            }
            urls.push(UrlEntry {
                loc: base.join_segment("category", slug),
                lastmod: today,
                changefreq: ChangeFrequency::Daily,
                priority: Priority::SECTION,
            });
        }

        let mut seen_articles = HashSet::new();
        for article in articles.iter().filter(|a| a.published) {
            let slug = match normalize_slug(&article.slug) {
                Ok(slug) => slug,
                Err(err) => {
                    tracing::warn!(slug = %article.slug, %err, "skipping article with malformed slug");
                    continue;
                }
            };
            if !seen_articles.insert(slug) {
                tracing::warn!(%slug, "skipping duplicate article");
                continue;
            }
            urls.push(UrlEntry {
                loc: base.join_segment("article", slug),
                lastmod: article.updated_at.map_or(today, |at| at.date_naive()),
                changefreq: ChangeFrequency::Weekly,
                priority: Priority::SECTION,
            });
        }

        urls.push(UrlEntry {
            loc: base.join("/rss"),
            lastmod: today,
            changefreq: ChangeFrequency::Daily,
            priority: Priority::FEED,
        });

        if urls.len() > MAX_URLS {
            tracing::warn!(
                urls = urls.len(),
                limit = MAX_URLS,
                "sitemap exceeds the protocol URL limit; crawlers may truncate it"
            );
        }

        Self { urls }
    }

    pub fn urls(&self) -> &[UrlEntry] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.urls.len() * 160);

        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"");
        xml.push_str(SITEMAP_NS);
        xml.push_str("\">\n");

        for entry in &self.urls {
            xml.push_str("  <url>\n    <loc>");
            xml.push_str(&escape_xml(&entry.loc));
            xml.push_str("</loc>\n    <lastmod>");
            xml.push_str(&entry.lastmod.format("%Y-%m-%d").to_string());
            xml.push_str("</lastmod>\n    <changefreq>");
            xml.push_str(entry.changefreq.as_str());
            xml.push_str("</changefreq>\n    <priority>");
            xml.push_str(&entry.priority.to_string());
            xml.push_str("</priority>\n  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

/// Render `sitemap.xml` for a raw base URL
///
/// Fails only on configuration problems: a malformed base URL or static page table.
pub fn build(
    base_url: &str,
    articles: &[ArticleRecord],
    categories: &[CategoryRecord],
    static_pages: &[StaticPage],
    now: DateTime<Utc>,
) -> Result<String, ConfigError> {
    let base = BaseUrl::parse(base_url)?;
    validate_static_pages(static_pages)?;
    Ok(SitemapDocument::assemble(&base, articles, categories, static_pages, now).to_xml())
}

/// Escape special XML characters.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    // Fast path: check if escaping is needed
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
