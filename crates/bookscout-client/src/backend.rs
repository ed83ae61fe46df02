use std::time::Duration;

use bookscout_core::error::AppError;
use bookscout_core::models::{
    BookSource, BooksResponse, CrawlRequest, CrawlResponse, HealthReport, StoreStats,
};
use bookscout_core::traits::Backend;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

const USER_AGENT: &str = "bookscout/0.1";

/// HTTP client for the scraping backend, using reqwest.
///
/// The client itself has no global timeout: every call carries its own
/// bound, since a health probe and a full crawl differ by two orders of
/// magnitude.
#[derive(Clone)]
pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, AppError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        if !status.is_success() {
            return Err(AppError::BackendRejected {
                status_code: status.as_u16(),
                detail: error_detail(status, &body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl Backend for ReqwestBackend {
    async fn health(&self, base_url: &str, timeout: Duration) -> Result<HealthReport, AppError> {
        let url = endpoint(base_url, "/health")?;
        self.send(self.client.get(url), timeout).await
    }

    async fn crawl(
        &self,
        base_url: &str,
        source: BookSource,
        request: &CrawlRequest,
        timeout: Duration,
    ) -> Result<CrawlResponse, AppError> {
        let url = endpoint(base_url, source.crawl_path())?;
        tracing::debug!(%url, keyword = %request.keyword, max_books = request.max_books, "POST crawl");
        self.send(self.client.post(url).json(request), timeout).await
    }

    async fn books(
        &self,
        base_url: &str,
        source: BookSource,
        keyword: Option<&str>,
        timeout: Duration,
    ) -> Result<BooksResponse, AppError> {
        let url = books_url(base_url, source, keyword)?;
        tracing::debug!(%url, "GET books");
        self.send(self.client.get(url), timeout).await
    }

    async fn stats(&self, base_url: &str, timeout: Duration) -> Result<StoreStats, AppError> {
        let url = endpoint(base_url, "/api/stats")?;
        self.send(self.client.get(url), timeout).await
    }
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, AppError> {
    Url::parse(base_url)
        .and_then(|base| base.join(path))
        .map_err(|e| AppError::ConfigError(format!("Invalid backend URL '{base_url}': {e}")))
}

fn books_url(base_url: &str, source: BookSource, keyword: Option<&str>) -> Result<Url, AppError> {
    let mut url = endpoint(base_url, source.books_path())?;
    if let Some(keyword) = keyword {
        url.query_pairs_mut().append_pair("keyword", keyword);
    }
    Ok(url)
}

/// Timeouts first, then anything that never got a response.
fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout.as_secs_f64().ceil() as u64)
    } else if e.is_connect() || e.is_request() {
        AppError::TransportFailure(format!("Connection failed: {e}"))
    } else {
        AppError::Unknown(e.to_string())
    }
}

/// The backend's `detail` field, else the status reason phrase.
fn error_detail(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());

    match detail {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        Some(serde_json::Value::Null) | None => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        Some(other) => other.to_string(),
    }
}
