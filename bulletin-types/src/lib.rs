//! Shared types for bulletin
//!
//! This crate provides the record projections read from the content store
//! and the small value types that appear in sitemap entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Article row as seen by the sitemap
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Path segment under `/article/`; may arrive with leading slashes
    #[serde(default)]
    pub slug: String,

    /// Last edit time; the build date is used when absent
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub published: bool,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
}

impl ArticleRecord {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            published: true,
            ..Self::default()
        }
    }

    pub fn updated(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn published_on(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }
}

/// Category row as seen by the sitemap
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryRecord {
    #[serde(default)]
    pub slug: String,
}

impl CategoryRecord {
    pub fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }
}

/// `<changefreq>` values allowed by the sitemap protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("unknown change frequency: {0}")]
    ChangeFrequency(String),

    #[error("priority out of range: {0} tenths (max 10)")]
    Priority(u8),
}

impl FromStr for ChangeFrequency {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(ChangeFrequency::Always),
            "hourly" => Ok(ChangeFrequency::Hourly),
            "daily" => Ok(ChangeFrequency::Daily),
            "weekly" => Ok(ChangeFrequency::Weekly),
            "monthly" => Ok(ChangeFrequency::Monthly),
            "yearly" => Ok(ChangeFrequency::Yearly),
            "never" => Ok(ChangeFrequency::Never),
            _ => Err(ValueError::ChangeFrequency(s.to_string())),
        }
    }
}

/// `<priority>` in tenths, rendered with one decimal place
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const HOME: Priority = Priority(10);
    pub const SECTION: Priority = Priority(8);
    pub const STATIC_PAGE: Priority = Priority(7);
    pub const FEED: Priority = Priority(5);

    pub fn from_tenths(tenths: u8) -> Result<Self, ValueError> {
        if tenths > 10 {
            return Err(ValueError::Priority(tenths));
        }
        Ok(Self(tenths))
    }

    pub fn tenths(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}
