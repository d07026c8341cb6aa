//! Configuration parsing and management.

use crate::sitemap::{default_static_pages, StaticPage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Config file looked up in the working directory when none is named
pub const DEFAULT_CONFIG_FILE: &str = "bulletin.yml";

/// Production domain used when nothing overrides `site.url`
pub const DEFAULT_SITE_URL: &str = "https://thebulletinbriefs.in";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid static page {path:?}: {reason}")]
    InvalidStaticPage { path: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Main configuration struct matching the bulletin.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub sitemap: SitemapConfig,

    #[serde(default)]
    pub news_sitemap: NewsSitemapConfig,

    #[serde(default)]
    pub indexnow: IndexNowConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_url")]
    pub url: String,

    #[serde(default = "default_site_name")]
    pub name: String,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_site_url() -> String {
    DEFAULT_SITE_URL.to_string()
}

fn default_site_name() -> String {
    "The Bulletin Briefs".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
            name: default_site_name(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Where article and category rows come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// PostgREST-style table API of the hosted backend
    Rest(RestSourceConfig),
    /// Local YAML file, re-read on every fetch
    Snapshot(SnapshotSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Rest(RestSourceConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestSourceConfig {
    pub url: Option<String>,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub articles_table: String,
    pub categories_table: String,
    pub article_columns: String,
    pub article_filter: Option<String>,
    pub category_filter: Option<String>,
    pub order: String,
    pub page_size: usize,
}

impl Default for RestSourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            articles_table: "articles".to_string(),
            categories_table: "categories".to_string(),
            article_columns: "slug,updated_at,status,title,published_at".to_string(),
            article_filter: Some("status=eq.published".to_string()),
            category_filter: None,
            order: "slug.asc".to_string(),
            page_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Seconds advertised in `Cache-Control: public, max-age=N`
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,

    #[serde(default = "default_static_pages")]
    pub static_pages: Vec<StaticPage>,
}

fn default_cache_max_age() -> u64 {
    3600
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            cache_max_age: default_cache_max_age(),
            static_pages: default_static_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSitemapConfig {
    #[serde(default = "default_true")]
    pub enable: bool,

    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_window_hours() -> u32 {
    48
}

fn default_max_entries() -> usize {
    1000
}

impl Default for NewsSitemapConfig {
    fn default() -> Self {
        Self {
            enable: true,
            window_hours: default_window_hours(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexNowConfig {
    #[serde(default)]
    pub key: Option<String>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub site_url: Option<String>,
    pub listen_addr: Option<String>,
    pub source_url: Option<String>,
    pub source_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            server: ServerConfig::default(),
            source: SourceConfig::default(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            sitemap: SitemapConfig::default(),
            news_sitemap: NewsSitemapConfig::default(),
            indexnow: IndexNowConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load the named file, or `bulletin.yml` if present, or built-in defaults
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    tracing::debug!("No {} found; using built-in defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.site_url {
            self.site.url = url;
        }
        if let Some(addr) = overrides.listen_addr {
            self.server.listen_addr = addr;
        }
        match &mut self.source {
            SourceConfig::Rest(rest) => {
                if let Some(url) = overrides.source_url {
                    rest.url = Some(url);
                }
                if let Some(key) = overrides.source_api_key {
                    rest.api_key = Some(key);
                }
            }
            SourceConfig::Snapshot(_) => {
                if overrides.source_url.is_some() || overrides.source_api_key.is_some() {
                    tracing::debug!("Ignoring REST source overrides for snapshot source");
                }
            }
        }
    }

    /// Check everything that would otherwise fail per request
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        validate_static_pages(&self.sitemap.static_pages)?;

        if let SourceConfig::Rest(rest) = &self.source {
            let url = rest
                .url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingField("source.url".into()))?;
            Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                field: "source.url".into(),
                reason: e.to_string(),
            })?;
            if rest.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                return Err(ConfigError::MissingField("source.api_key".into()));
            }
            if rest.page_size == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "source.page_size".into(),
                    reason: "must be at least 1".into(),
                });
            }
        }

        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }

        if let Some(key) = &self.indexnow.key {
            crate::seo::validate_indexnow_key(key)?;
        }

        Ok(())
    }

    /// Site root as a validated absolute URL without trailing slash
    pub fn base_url(&self) -> Result<BaseUrl, ConfigError> {
        BaseUrl::parse(&self.site.url)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Snapshot file, resolved relative to config file
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        match &self.source {
            SourceConfig::Snapshot(snapshot) => Some(self.resolve_path(&snapshot.path)),
            SourceConfig::Rest(_) => None,
        }
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }

    /// Get a nested config value using dotted path (e.g., "site.url")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["site", "url"] => Some(self.site.url.clone()),
            ["site", "name"] => Some(self.site.name.clone()),
            ["site", "language"] => Some(self.site.language.clone()),
            ["server", "listen_addr"] => Some(self.server.listen_addr.clone()),
            ["source", "kind"] => Some(
                match self.source {
                    SourceConfig::Rest(_) => "rest",
                    SourceConfig::Snapshot(_) => "snapshot",
                }
                .to_string(),
            ),
            ["sitemap", "cache_max_age"] => Some(self.sitemap.cache_max_age.to_string()),
            ["news_sitemap", "enable"] => Some(self.news_sitemap.enable.to_string()),
            _ => None,
        }
    }
}

pub(crate) fn validate_static_pages(pages: &[StaticPage]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for page in pages {
        let invalid = |reason: &str| ConfigError::InvalidStaticPage {
            path: page.path.clone(),
            reason: reason.to_string(),
        };
        if !page.path.starts_with('/') || page.path.starts_with("//") {
            return Err(invalid("path must start with a single '/'"));
        }
        if page.path.len() == 1 {
            return Err(invalid("the homepage is always emitted"));
        }
        if page.path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("path contains whitespace or control characters"));
        }
        if !seen.insert(page.path.as_str()) {
            return Err(invalid("duplicate path"));
        }
    }
    Ok(())
}

/// Absolute site root, e.g. `https://thebulletinbriefs.in`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    root: String,
    url: Url,
}

impl BaseUrl {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let root = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if root.ends_with('/') {
            return Err(invalid("multiple trailing slashes"));
        }

        let parsed = Url::parse(root).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("query strings and fragments are not allowed"));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials are not allowed"));
        }
        if root.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("contains whitespace"));
        }

        Ok(Self {
            root: root.to_string(),
            url: parsed,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.root
    }

    /// Append an absolute site path (`/about`)
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.root, path)
    }

    /// Append `/{section}/{segment}`, percent-encoding `segment` as one path segment
    ///
    /// `#`, `?`, `/` and `%` in the segment are encoded, so the result always
    /// names a resource under `section`.
    pub fn join_segment(&self, section: &str, segment: &str) -> String {
        let mut url = self.url.clone();
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(section).push(segment);
            }
            // only cannot-be-a-base URLs, which parse() rejects
            Err(()) => return self.join(&format!("/{section}/{segment}")),
        }
        url.into()
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.root)
    }
}
