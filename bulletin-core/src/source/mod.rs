//! Content sources: where article and category rows come from.
//!
//! The sitemap only ever sees a [`Snapshot`] taken fresh for each request.
//! Both halves of the snapshot are fetched concurrently and each is bounded
//! by the configured timeout; either failing fails the whole snapshot.

mod rest;
mod snapshot;

pub use rest::RestSource;
pub use snapshot::SnapshotSource;

use crate::config::{Config, ConfigError, SourceConfig};
use async_trait::async_trait;
use bulletin_types::{ArticleRecord, CategoryRecord};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request for {table} failed: {source}")]
    Http {
        table: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{table} responded with HTTP {status}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {table} rows: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("fetching {what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    #[error("content source unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the content store
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All published articles, in source order
    async fn published_articles(&self) -> Result<Vec<ArticleRecord>, FetchError>;

    /// All active categories, in source order
    async fn active_categories(&self) -> Result<Vec<CategoryRecord>, FetchError>;
}

/// Rows fetched for a single build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,

    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
}

/// Fetch articles and categories concurrently, each under `timeout`
pub async fn fetch_snapshot(
    source: &dyn ContentSource,
    timeout: Duration,
) -> Result<Snapshot, FetchError> {
    let (articles, categories) = tokio::try_join!(
        bounded("articles", timeout, source.published_articles()),
        bounded("categories", timeout, source.active_categories()),
    )?;

    tracing::debug!(
        articles = articles.len(),
        categories = categories.len(),
        "fetched content snapshot"
    );

    Ok(Snapshot {
        articles,
        categories,
    })
}

/// Fetch only articles (the news sitemap has no use for categories)
pub async fn fetch_articles(
    source: &dyn ContentSource,
    timeout: Duration,
) -> Result<Vec<ArticleRecord>, FetchError> {
    bounded("articles", timeout, source.published_articles()).await
}

async fn bounded<T, F>(what: &'static str, timeout: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            what,
            after: timeout,
        }),
    }
}

/// Build the source named by the configuration
pub fn source_from_config(config: &Config) -> Result<Arc<dyn ContentSource>, ConfigError> {
    match &config.source {
        SourceConfig::Rest(rest) => Ok(Arc::new(RestSource::new(rest, config.fetch_timeout())?)),
        SourceConfig::Snapshot(_) => {
            let path = config
                .snapshot_path()
                .ok_or_else(|| ConfigError::MissingField("source.path".into()))?;
            Ok(Arc::new(SnapshotSource::from_path(path)))
        }
    }
}
