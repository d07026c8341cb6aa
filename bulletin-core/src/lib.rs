//! # bulletin-core
//!
//! Core library for the bulletin sitemap service.
//!
//! This crate turns a snapshot of article and category rows into the
//! crawler-facing documents (`sitemap.xml`, `news-sitemap.xml`, `robots.txt`)
//! and defines where those rows come from.

pub mod config;
pub mod news;
pub mod seo;
pub mod sitemap;
pub mod slug;
pub mod source;

pub use config::{BaseUrl, Config, ConfigError, Overrides};
pub use news::{NewsSitemap, Publication};
pub use sitemap::{build, default_static_pages, SitemapDocument, StaticPage, UrlEntry};
pub use slug::normalize_slug;
pub use source::{
    fetch_articles, fetch_snapshot, source_from_config, ContentSource, FetchError, RestSource,
    Snapshot, SnapshotSource,
};
