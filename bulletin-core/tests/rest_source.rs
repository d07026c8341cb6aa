//! RestSource against a throwaway table API served from the test process.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use bulletin_core::config::RestSourceConfig;
use bulletin_core::{ContentSource, FetchError, RestSource};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEY: &str = "service-role-test";

#[derive(Clone)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
    articles: usize,
    max_rows: usize,
}

impl Recorded {
    fn for_table(&self, table: &str) -> Vec<HashMap<String, String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == table)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

async fn table_rows(
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(recorded): State<Recorded>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    if header("apikey").as_deref() != Some(KEY)
        || header("authorization") != Some(format!("Bearer {KEY}"))
    {
        return Err((StatusCode::UNAUTHORIZED, "{\"message\":\"Invalid API key\"}".into()));
    }

    recorded
        .requests
        .lock()
        .unwrap()
        .push((table.clone(), params.clone()));

    let offset: usize = params.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(usize::MAX)
        .min(recorded.max_rows);

    let rows: Vec<Value> = match table.as_str() {
        "articles" => (0..recorded.articles)
            .map(|i| {
                let updated_at = match i {
                    1 => "2024-03-15T10:30:00",
                    2 => "not a date",
                    _ => "2024-03-15T10:30:00+00:00",
                };
                json!({
                    "slug": format!("story-{i}"),
                    "updated_at": updated_at,
                    "status": "published",
                    "title": format!("Story {i}"),
                    "published_at": null,
                })
            })
            .collect(),
        "categories" => vec![json!({ "slug": "world" }), json!({ "slug": "business" })],
        _ => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "relation does not exist".into(),
            ))
        }
    };

    Ok(Json(Value::Array(
        rows.into_iter().skip(offset).take(limit).collect(),
    )))
}

async fn spawn_backend() -> (String, Recorded) {
    spawn_capped_backend(5, usize::MAX).await
}

/// Backend holding `articles` rows that never returns more than `max_rows` per request
async fn spawn_capped_backend(articles: usize, max_rows: usize) -> (String, Recorded) {
    let recorded = Recorded {
        requests: Arc::default(),
        articles,
        max_rows,
    };
    let app = Router::new()
        .route("/rest/v1/{table}", get(table_rows))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), recorded)
}

fn settings(url: &str, page_size: usize) -> RestSourceConfig {
    RestSourceConfig {
        url: Some(url.to_string()),
        api_key: Some(KEY.to_string()),
        page_size,
        ..RestSourceConfig::default()
    }
}

#[tokio::test]
async fn pages_through_every_article() {
    let (url, recorded) = spawn_backend().await;
    let source = RestSource::new(&settings(&url, 2), Duration::from_secs(5)).unwrap();

    let articles = source.published_articles().await.unwrap();
    let slugs: Vec<&str> = articles.iter().map(|a| a.slug.as_str()).collect();
    assert_eq!(slugs, ["story-0", "story-1", "story-2", "story-3", "story-4"]);
    assert!(articles.iter().all(|a| a.published));
    assert_eq!(articles[0].title.as_deref(), Some("Story 0"));

    let requests = recorded.for_table("articles");
    let offsets: Vec<&str> = requests.iter().map(|p| p["offset"].as_str()).collect();
    assert_eq!(offsets, ["0", "2", "4", "5"]);
    assert_eq!(requests[0]["status"], "eq.published");
    assert_eq!(requests[0]["select"], "slug,updated_at,status,title,published_at");
    assert_eq!(requests[0]["order"], "slug.asc");
}

#[tokio::test]
async fn server_row_cap_does_not_truncate() {
    let (url, recorded) = spawn_capped_backend(10, 3).await;
    let source = RestSource::new(&settings(&url, 5), Duration::from_secs(5)).unwrap();

    let articles = source.published_articles().await.unwrap();
    assert_eq!(articles.len(), 10);
    assert_eq!(articles[9].slug, "story-9");

    let offsets: Vec<String> = recorded
        .for_table("articles")
        .into_iter()
        .map(|p| p["offset"].clone())
        .collect();
    assert_eq!(offsets, ["0", "3", "6", "9", "10"]);
}

#[tokio::test]
async fn odd_timestamps_do_not_fail_the_page() {
    let (url, _) = spawn_backend().await;
    let source = RestSource::new(&settings(&url, 1000), Duration::from_secs(5)).unwrap();

    let articles = source.published_articles().await.unwrap();
    assert_eq!(articles.len(), 5);
    let day = |i: usize| articles[i].updated_at.map(|at| at.date_naive().to_string());
    assert_eq!(day(0).as_deref(), Some("2024-03-15"));
    // offset-less `timestamp` column read as UTC
    assert_eq!(day(1).as_deref(), Some("2024-03-15"));
    assert_eq!(day(2), None);
}

#[tokio::test]
async fn full_last_page_triggers_one_more_request() {
    let (url, recorded) = spawn_backend().await;
    let source = RestSource::new(&settings(&url, 5), Duration::from_secs(5)).unwrap();

    assert_eq!(source.published_articles().await.unwrap().len(), 5);
    let offsets: Vec<String> = recorded
        .for_table("articles")
        .into_iter()
        .map(|p| p["offset"].clone())
        .collect();
    assert_eq!(offsets, ["0", "5"]);
}

#[tokio::test]
async fn categories_keep_source_order() {
    let (url, recorded) = spawn_backend().await;
    let source = RestSource::new(&settings(&url, 1000), Duration::from_secs(5)).unwrap();

    let categories = source.active_categories().await.unwrap();
    let slugs: Vec<&str> = categories.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, ["world", "business"]);
    assert_eq!(recorded.for_table("categories")[0]["select"], "slug");
}

#[tokio::test]
async fn rejected_key_is_a_status_error() {
    let (url, _) = spawn_backend().await;
    let mut config = settings(&url, 100);
    config.api_key = Some("wrong".into());
    let source = RestSource::new(&config, Duration::from_secs(5)).unwrap();

    match source.published_articles().await {
        Err(FetchError::Status { status, body, .. }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_a_status_error() {
    let (url, _) = spawn_backend().await;
    let mut config = settings(&url, 100);
    config.articles_table = "missing_table".into();
    let source = RestSource::new(&config, Duration::from_secs(5)).unwrap();

    let err = source.published_articles().await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500, .. }));
}

#[tokio::test]
async fn unreachable_backend_is_an_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source =
        RestSource::new(&settings(&format!("http://{addr}"), 100), Duration::from_secs(5)).unwrap();
    let err = source.active_categories().await.unwrap_err();
    assert!(matches!(err, FetchError::Http { .. }));
}
