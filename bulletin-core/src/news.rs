//! Google News sitemap (`news-sitemap.xml`).
//!
//! Lists recently published articles with their publication metadata. Only
//! articles inside the freshness window are included, newest first.

use crate::config::{BaseUrl, NewsSitemapConfig, SiteConfig};
use crate::sitemap::{escape_xml, SITEMAP_NS};
use crate::slug::normalize_slug;
use bulletin_types::ArticleRecord;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::HashSet;

pub const NEWS_NS: &str = "http://www.google.com/schemas/sitemap-news/0.9";

/// Publication block shared by every entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub name: String,
    pub language: String,
}

impl From<&SiteConfig> for Publication {
    fn from(site: &SiteConfig) -> Self {
        Self {
            name: site.name.clone(),
            language: site.language.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsEntry {
    pub loc: String,
    pub title: String,
    pub published: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsSitemap {
    publication: Publication,
    entries: Vec<NewsEntry>,
}

impl NewsSitemap {
    pub fn assemble(
        base: &BaseUrl,
        publication: Publication,
        articles: &[ArticleRecord],
        settings: &NewsSitemapConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let cutoff = now - Duration::hours(i64::from(settings.window_hours));
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for article in articles.iter().filter(|a| a.published) {
            let Ok(slug) = normalize_slug(&article.slug) else {
                tracing::debug!(slug = %article.slug, "news sitemap: skipping malformed slug");
                continue;
            };
            let Some(title) = article.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
            else {
                tracing::debug!(%slug, "news sitemap: skipping untitled article");
                continue;
            };
            let Some(published) = article.published_at.or(article.updated_at) else {
                continue;
            };
            if published < cutoff || published > now || !seen.insert(slug) {
                continue;
            }
            entries.push(NewsEntry {
                loc: base.join_segment("article", slug),
                title: title.to_string(),
                published,
            });
        }

        // Stable sort keeps source order among equal timestamps
        entries.sort_by(|a, b| b.published.cmp(&a.published));
        entries.truncate(settings.max_entries);

        Self {
            publication,
            entries,
        }
    }

    pub fn entries(&self) -> &[NewsEntry] {
        &self.entries
    }

    pub fn to_xml(&self) -> String {
        let name = escape_xml(&self.publication.name);
        let language = escape_xml(&self.publication.language);
        let mut xml = String::with_capacity(256 + self.entries.len() * 400);

        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<urlset xmlns=\"{SITEMAP_NS}\" xmlns:news=\"{NEWS_NS}\">\n"
        ));

        for entry in &self.entries {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            xml.push_str("    <news:news>\n      <news:publication>\n");
            xml.push_str(&format!("        <news:name>{name}</news:name>\n"));
            xml.push_str(&format!("        <news:language>{language}</news:language>\n"));
            xml.push_str("      </news:publication>\n");
            xml.push_str(&format!(
                "      <news:publication_date>{}</news:publication_date>\n",
                entry.published.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
            xml.push_str(&format!(
                "      <news:title>{}</news:title>\n",
                escape_xml(&entry.title)
            ));
            xml.push_str("    </news:news>\n  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}
