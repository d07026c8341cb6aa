use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bulletin_core::config::NewsSitemapConfig;
use bulletin_core::{
    fetch_articles, fetch_snapshot, seo, BaseUrl, Config, ConfigError, ContentSource, FetchError,
    NewsSitemap, Publication, SitemapDocument, Snapshot, StaticPage,
};
use bulletin_types::ArticleRecord;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Everything a request needs from the configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub base: BaseUrl,
    pub publication: Publication,
    pub static_pages: Vec<StaticPage>,
    pub cache_max_age: u64,
    pub fetch_timeout: Duration,
    pub news: NewsSitemapConfig,
    pub indexnow_key: Option<String>,
}

impl SiteSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            base: config.base_url()?,
            publication: Publication::from(&config.site),
            static_pages: config.sitemap.static_pages.clone(),
            cache_max_age: config.sitemap.cache_max_age,
            fetch_timeout: config.fetch_timeout(),
            news: config.news_sitemap.clone(),
            indexnow_key: config.indexnow.key.clone(),
        })
    }

    /// Fetch a fresh snapshot and render sitemap.xml
    pub async fn sitemap_document(
        &self,
        source: &dyn ContentSource,
        now: DateTime<Utc>,
    ) -> Result<SitemapDocument, FetchError> {
        let snapshot = fetch_snapshot(source, self.fetch_timeout).await?;
        Ok(self.assemble_sitemap(&snapshot, now))
    }

    /// Fetch articles and render news-sitemap.xml
    pub async fn news_document(
        &self,
        source: &dyn ContentSource,
        now: DateTime<Utc>,
    ) -> Result<NewsSitemap, FetchError> {
        let articles = fetch_articles(source, self.fetch_timeout).await?;
        Ok(self.assemble_news(&articles, now))
    }

    pub fn assemble_sitemap(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> SitemapDocument {
        SitemapDocument::assemble(
            &self.base,
            &snapshot.articles,
            &snapshot.categories,
            &self.static_pages,
            now,
        )
    }

    pub fn assemble_news(&self, articles: &[ArticleRecord], now: DateTime<Utc>) -> NewsSitemap {
        NewsSitemap::assemble(
            &self.base,
            self.publication.clone(),
            articles,
            &self.news,
            now,
        )
    }

    pub fn robots_txt(&self) -> String {
        seo::robots_txt(&self.base, self.news.enable)
    }

    fn cache_control(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("public, max-age={}", self.cache_max_age))
            .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub site: Arc<SiteSettings>,
    pub source: Arc<dyn ContentSource>,
}

impl AppState {
    pub fn new(config: &Config, source: Arc<dyn ContentSource>) -> Result<Self, ConfigError> {
        Ok(Self {
            site: Arc::new(SiteSettings::from_config(config)?),
            source,
        })
    }
}

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("content fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        // Crawlers only ever see the generic body
        tracing::error!(error = %self, "failed to build document");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [
                (header::CONTENT_TYPE, TEXT_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-store"),
            ],
            "Internal Server Error",
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sitemap.xml", get(sitemap))
        .route("/news-sitemap.xml", get(news_sitemap))
        .route("/robots.txt", get(robots))
        .route("/{file}", get(root_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config, source: Arc<dyn ContentSource>) -> Result<()> {
    serve_until(config, source, shutdown_signal()).await
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve_until<F>(config: &Config, source: Arc<dyn ContentSource>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(config, source).context("invalid configuration")?;
    let app = router(state);

    let addr = &config.server.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, site = %config.site.url, "bulletin listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C (SIGINT) or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn sitemap(State(state): State<AppState>) -> Result<Response, ServeError> {
    let document = state
        .site
        .sitemap_document(state.source.as_ref(), Utc::now())
        .await?;
    tracing::debug!(urls = document.len(), "rendered sitemap");
    Ok(xml_response(&state.site, document.to_xml()))
}

async fn news_sitemap(State(state): State<AppState>) -> Result<Response, ServeError> {
    if !state.site.news.enable {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    let document = state
        .site
        .news_document(state.source.as_ref(), Utc::now())
        .await?;
    tracing::debug!(entries = document.entries().len(), "rendered news sitemap");
    Ok(xml_response(&state.site, document.to_xml()))
}

async fn robots(State(state): State<AppState>) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE)),
            (header::CACHE_CONTROL, state.site.cache_control()),
        ],
        state.site.robots_txt(),
    )
        .into_response()
}

/// IndexNow key verification file at the site root
async fn root_file(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    match state.site.indexnow_key.as_deref() {
        Some(key) if file == seo::indexnow_key_file(key) => (
            [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
            key.to_string(),
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn xml_response(site: &SiteSettings, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE)),
            (header::CACHE_CONTROL, site.cache_control()),
        ],
        body,
    )
        .into_response()
}
