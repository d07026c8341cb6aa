use super::{ContentSource, FetchError, Snapshot};
use async_trait::async_trait;
use bulletin_types::{ArticleRecord, CategoryRecord};
use std::path::{Path, PathBuf};

/// Rows read from a YAML file (or held in memory)
///
/// ```yaml
/// articles:
///   - slug: budget-2024
///     updated_at: 2024-03-15T10:30:00Z
///     published: true
/// categories:
///   - slug: business
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    origin: Origin,
}

#[derive(Debug, Clone)]
enum Origin {
    File(PathBuf),
    Memory(Snapshot),
}

impl SnapshotSource {
    /// Re-read `path` on every fetch
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            origin: Origin::Memory(snapshot),
        }
    }

    async fn load(&self) -> Result<Snapshot, FetchError> {
        match &self.origin {
            Origin::Memory(snapshot) => Ok(snapshot.clone()),
            Origin::File(path) => read_snapshot(path).await,
        }
    }
}

async fn read_snapshot(path: &Path) -> Result<Snapshot, FetchError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_yaml::from_str(&contents).map_err(|source| FetchError::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl ContentSource for SnapshotSource {
    async fn published_articles(&self) -> Result<Vec<ArticleRecord>, FetchError> {
        let snapshot = self.load().await?;
        Ok(snapshot.articles.into_iter().filter(|a| a.published).collect())
    }

    async fn active_categories(&self) -> Result<Vec<CategoryRecord>, FetchError> {
        Ok(self.load().await?.categories)
    }
}
