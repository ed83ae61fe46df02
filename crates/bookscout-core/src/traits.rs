use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{
    BookSource, BooksResponse, CrawlRequest, CrawlResponse, HealthReport, StoreStats,
};

/// The scraping backend's HTTP contract.
///
/// Every call takes the base URL explicitly: the resolved endpoint lives in
/// the process context, not in the transport.
///
/// Implementations classify failures: connection problems as
/// [`AppError::TransportFailure`], client timeouts as [`AppError::Timeout`],
/// non-2xx responses as [`AppError::BackendRejected`].
pub trait Backend: Send + Sync + Clone + 'static {
    /// `GET /health`.
    fn health(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<HealthReport, AppError>> + Send;

    /// `POST /api/crawl`, or `/api/crawl/fanqie` for [`BookSource::Fanqie`].
    fn crawl(
        &self,
        base_url: &str,
        source: BookSource,
        request: &CrawlRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<CrawlResponse, AppError>> + Send;

    /// `GET /api/books` (or its Fanqie twin), all stored books when
    /// `keyword` is `None`.
    fn books(
        &self,
        base_url: &str,
        source: BookSource,
        keyword: Option<&str>,
        timeout: Duration,
    ) -> impl Future<Output = Result<BooksResponse, AppError>> + Send;

    /// `GET /api/stats`.
    fn stats(
        &self,
        base_url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<StoreStats, AppError>> + Send;
}

/// Synchronous yes/no gate shown before expensive operations.
pub trait ConfirmGate: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Host hook for leaving the current page after an outage.
pub trait Navigator: Send + Sync + 'static {
    fn navigate_away(&self);
}
