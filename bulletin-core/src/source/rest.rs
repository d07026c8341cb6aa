use super::{ContentSource, FetchError};
use crate::config::{ConfigError, RestSourceConfig};
use async_trait::async_trait;
use bulletin_types::{ArticleRecord, CategoryRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const MAX_ERROR_BODY: usize = 512;

/// Table API of the hosted backend (`{url}/rest/v1/{table}`)
///
/// Results are paged with `limit`/`offset` until an empty page comes back,
/// so corpus size is capped neither by the page size nor by a server-side
/// row limit.
#[derive(Debug, Clone)]
pub struct RestSource {
    client: reqwest::Client,
    endpoint: String,
    settings: RestSourceConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleRow {
    slug: Option<String>,
    // Parsed per row so one odd timestamp cannot fail the whole page
    updated_at: Option<Value>,
    status: Option<String>,
    published: Option<bool>,
    title: Option<String>,
    published_at: Option<Value>,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        // Rows without either column already passed the server-side filter
        let published = match (row.published, row.status.as_deref()) {
            (Some(flag), _) => flag,
            (None, Some(status)) => status.eq_ignore_ascii_case("published"),
            (None, None) => true,
        };
        let slug = row.slug.unwrap_or_default();
        let updated_at = row_timestamp(&slug, "updated_at", row.updated_at);
        let published_at = row_timestamp(&slug, "published_at", row.published_at);
        ArticleRecord {
            slug,
            updated_at,
            published,
            title: row.title,
            published_at,
        }
    }
}

fn row_timestamp(slug: &str, column: &str, value: Option<Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Null => None,
        Value::String(raw) => {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                tracing::warn!(%slug, column, value = %raw, "ignoring unparseable timestamp");
            }
            parsed
        }
        other => {
            tracing::warn!(%slug, column, value = %other, "ignoring non-string timestamp");
            None
        }
    }
}

/// RFC 3339 first, then offset-less `timestamp` columns read as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    // Postgres text output: `2024-03-15 10:30:00+00`
    if let Ok(at) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryRow {
    slug: Option<String>,
}

impl RestSource {
    pub fn new(settings: &RestSourceConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("source.url".into()))?;
        let api_key = settings
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("source.api_key".into()))?;

        let invalid_key = |_| ConfigError::InvalidValue {
            field: "source.api_key".into(),
            reason: "not a valid header value".into(),
        };
        let mut headers = HeaderMap::new();
        let mut key_header = HeaderValue::from_str(api_key).map_err(invalid_key)?;
        key_header.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(invalid_key)?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key_header);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "source".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1", url.trim_end_matches('/')),
            settings: settings.clone(),
        })
    }

    async fn fetch_all<R: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        filter: Option<&str>,
    ) -> Result<Vec<R>, FetchError> {
        let page_size = self.settings.page_size.max(1);
        let mut rows = Vec::new();
        let mut offset = 0usize;

        loop {
            let page: Vec<R> = self.fetch_page(table, select, filter, offset, page_size).await?;
            let fetched = page.len();
            tracing::debug!(table, offset, fetched, "fetched page");
            // The server may cap rows below `page_size` (db-max-rows), so a
            // short page is not the end; only an empty one is.
            if fetched == 0 {
                break;
            }
            rows.extend(page);
            offset += fetched;
        }

        Ok(rows)
    }

    async fn fetch_page<R: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        filter: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<R>, FetchError> {
        let mut query: Vec<(String, String)> = vec![
            ("select".into(), select.to_string()),
            ("order".into(), self.settings.order.clone()),
            ("limit".into(), limit.to_string()),
            ("offset".into(), offset.to_string()),
        ];
        query.extend(filter_pairs(filter));

        let url = format!("{}/{}", self.endpoint, table);
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                table: table.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|source| FetchError::Http {
            table: table.to_string(),
            source,
        })?;

        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&body).into_owned();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(FetchError::Status {
                table: table.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            table: table.to_string(),
            source,
        })
    }
}

/// Split `status=eq.published&lang=eq.en` into query pairs
fn filter_pairs(filter: Option<&str>) -> Vec<(String, String)> {
    filter
        .into_iter()
        .flat_map(|f| f.split('&'))
        .filter_map(|part| part.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[async_trait]
impl ContentSource for RestSource {
    async fn published_articles(&self) -> Result<Vec<ArticleRecord>, FetchError> {
        let rows: Vec<ArticleRow> = self
            .fetch_all(
                &self.settings.articles_table,
                &self.settings.article_columns,
                self.settings.article_filter.as_deref(),
            )
            .await?;
        Ok(rows.into_iter().map(ArticleRecord::from).collect())
    }

    async fn active_categories(&self) -> Result<Vec<CategoryRecord>, FetchError> {
        let rows: Vec<CategoryRow> = self
            .fetch_all(
                &self.settings.categories_table,
                "slug",
                self.settings.category_filter.as_deref(),
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| CategoryRecord::new(row.slug.unwrap_or_default()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_pairs() {
        assert_eq!(
            filter_pairs(Some("status=eq.published&lang=eq.en")),
            vec![
                ("status".to_string(), "eq.published".to_string()),
                ("lang".to_string(), "eq.en".to_string()),
            ]
        );
        assert!(filter_pairs(None).is_empty());
        assert!(filter_pairs(Some("garbage")).is_empty());
    }

    #[test]
    fn test_article_row_publication_flag() {
        let row: ArticleRow =
            serde_json::from_str(r#"{"slug":"a","status":"published"}"#).unwrap();
        assert!(ArticleRecord::from(row).published);

        let row: ArticleRow = serde_json::from_str(r#"{"slug":"a","status":"draft"}"#).unwrap();
        assert!(!ArticleRecord::from(row).published);

        let row: ArticleRow =
            serde_json::from_str(r#"{"slug":"a","published":false,"status":"published"}"#).unwrap();
        assert!(!ArticleRecord::from(row).published);

        let row: ArticleRow = serde_json::from_str(r#"{"slug":"a"}"#).unwrap();
        assert!(ArticleRecord::from(row).published);
    }

    #[test]
    fn test_article_row_timestamps() {
        let row: ArticleRow = serde_json::from_str(
            r#"{"slug":"a","updated_at":"2024-03-15T10:30:00.123456+00:00","title":null}"#,
        )
        .unwrap();
        let record = ArticleRecord::from(row);
        assert_eq!(
            record.updated_at.unwrap().date_naive().to_string(),
            "2024-03-15"
        );
        assert!(record.title.is_none());
    }

    #[test]
    fn test_mixed_timestamp_page_decodes() {
        let rows: Vec<ArticleRow> = serde_json::from_str(
            r#"[
                {"slug":"ok","updated_at":"2024-03-15T10:30:00+00:00"},
                {"slug":"naive","updated_at":"2024-03-15T10:30:00"},
                {"slug":"spaced","updated_at":"2024-03-16 08:00:00.5"},
                {"slug":"pg-text","updated_at":"2024-03-17 23:30:00-05"},
                {"slug":"date-only","published_at":"2024-03-18"},
                {"slug":"garbage","updated_at":"last tuesday"},
                {"slug":"number","updated_at":1710498600}
            ]"#,
        )
        .unwrap();
        let records: Vec<ArticleRecord> = rows.into_iter().map(ArticleRecord::from).collect();
        let day = |r: &ArticleRecord| r.updated_at.map(|at| at.date_naive().to_string());

        assert_eq!(records.len(), 7);
        assert_eq!(day(&records[0]).as_deref(), Some("2024-03-15"));
        assert_eq!(day(&records[1]).as_deref(), Some("2024-03-15"));
        assert_eq!(
            records[1].updated_at.unwrap().to_rfc3339(),
            "2024-03-15T10:30:00+00:00"
        );
        assert_eq!(day(&records[2]).as_deref(), Some("2024-03-16"));
        assert_eq!(day(&records[3]).as_deref(), Some("2024-03-18"));
        assert_eq!(
            records[4].published_at.map(|at| at.date_naive().to_string()).as_deref(),
            Some("2024-03-18")
        );
        assert!(records[5].updated_at.is_none());
        assert!(records[6].updated_at.is_none());
        assert!(records.iter().all(|r| r.published));
    }

    #[test]
    fn test_new_requires_credentials() {
        let settings = RestSourceConfig::default();
        assert!(matches!(
            RestSource::new(&settings, Duration::from_secs(1)),
            Err(ConfigError::MissingField(_))
        ));

        let settings = RestSourceConfig {
            url: Some("https://project.supabase.co/".into()),
            api_key: Some("key".into()),
            ..RestSourceConfig::default()
        };
        let source = RestSource::new(&settings, Duration::from_secs(1)).unwrap();
        assert_eq!(source.endpoint, "https://project.supabase.co/rest/v1");
    }
}
