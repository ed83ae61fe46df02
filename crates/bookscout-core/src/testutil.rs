//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` or atomics for interior mutability,
//! allowing test assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::liveness::{LivenessEvent, LivenessReporter};
use crate::models::{
    Book, BookSource, BooksResponse, CrawlRequest, CrawlResponse, HealthReport, StoreStats,
};
use crate::traits::{Backend, ConfirmGate, Navigator};

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// Mock backend with scripted responses.
///
/// Health answers come from a queue of healthy/unhealthy outcomes; once the
/// queue is empty the last scripted outcome repeats. Per-URL answers, when
/// set, take precedence (used for port discovery).
#[derive(Clone, Default)]
pub struct MockBackend {
    health_queue: Arc<Mutex<VecDeque<bool>>>,
    health_last: Arc<Mutex<bool>>,
    health_status: Arc<Mutex<Option<String>>>,
    health_by_url: Arc<Mutex<HashMap<String, bool>>>,
    delay_by_url: Arc<Mutex<HashMap<String, Duration>>>,
    health_delay: Duration,
    crawl_delay: Duration,
    crawl_responses: Arc<Mutex<VecDeque<Result<CrawlResponse, AppError>>>>,
    books_responses: Arc<Mutex<VecDeque<Result<BooksResponse, AppError>>>>,
    pub health_urls: Arc<Mutex<Vec<String>>>,
    pub crawl_requests: Arc<Mutex<Vec<CrawlRequest>>>,
    pub books_keywords: Arc<Mutex<Vec<Option<String>>>>,
    /// Source of every crawl and store call, in call order.
    pub sources: Arc<Mutex<Vec<BookSource>>>,
    health_calls: Arc<AtomicUsize>,
    crawl_calls: Arc<AtomicUsize>,
    books_calls: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Always healthy, no scripted crawl or store answers.
    pub fn healthy() -> Self {
        Self::with_health(vec![true])
    }

    pub fn with_health(outcomes: Vec<bool>) -> Self {
        let last = outcomes.last().copied().unwrap_or(true);
        Self {
            health_queue: Arc::new(Mutex::new(outcomes.into())),
            health_last: Arc::new(Mutex::new(last)),
            ..Default::default()
        }
    }

    /// Only the given base URLs answer healthy; everything else refuses.
    pub fn with_healthy_urls(urls: &[&str]) -> Self {
        let map = urls.iter().map(|u| (u.to_string(), true)).collect();
        Self {
            health_by_url: Arc::new(Mutex::new(map)),
            ..Default::default()
        }
    }

    /// Answer 200 with this status string instead of "healthy".
    pub fn with_health_status(self, status: &str) -> Self {
        *self.health_status.lock().unwrap() = Some(status.to_string());
        self
    }

    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = delay;
        self
    }

    /// Crawls take this long before answering.
    pub fn with_crawl_delay(mut self, delay: Duration) -> Self {
        self.crawl_delay = delay;
        self
    }

    pub fn with_url_delay(self, url: &str, delay: Duration) -> Self {
        self.delay_by_url
            .lock()
            .unwrap()
            .insert(url.to_string(), delay);
        self
    }

    pub fn push_crawl(self, response: Result<CrawlResponse, AppError>) -> Self {
        self.crawl_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn push_books(self, response: Result<BooksResponse, AppError>) -> Self {
        self.books_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn crawl_calls(&self) -> usize {
        self.crawl_calls.load(Ordering::SeqCst)
    }

    pub fn books_calls(&self) -> usize {
        self.books_calls.load(Ordering::SeqCst)
    }

    /// Total number of network calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.health_calls() + self.crawl_calls() + self.books_calls()
    }

    fn next_health(&self, base_url: &str) -> bool {
        if let Some(healthy) = self.health_by_url.lock().unwrap().get(base_url) {
            return *healthy;
        }
        if !self.health_by_url.lock().unwrap().is_empty() {
            return false;
        }
        let mut queue = self.health_queue.lock().unwrap();
        match queue.pop_front() {
            Some(healthy) => healthy,
            None => *self.health_last.lock().unwrap(),
        }
    }
}

impl Backend for MockBackend {
    async fn health(&self, base_url: &str, _timeout: Duration) -> Result<HealthReport, AppError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.health_urls.lock().unwrap().push(base_url.to_string());

        let delay = self
            .delay_by_url
            .lock()
            .unwrap()
            .get(base_url)
            .copied()
            .unwrap_or(self.health_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if !self.next_health(base_url) {
            return Err(AppError::TransportFailure("connection refused".into()));
        }
        let status = self
            .health_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "healthy".to_string());
        Ok(HealthReport { status })
    }

    async fn crawl(
        &self,
        _base_url: &str,
        source: BookSource,
        request: &CrawlRequest,
        _timeout: Duration,
    ) -> Result<CrawlResponse, AppError> {
        self.crawl_calls.fetch_add(1, Ordering::SeqCst);
        self.crawl_requests.lock().unwrap().push(request.clone());
        self.sources.lock().unwrap().push(source);
        if !self.crawl_delay.is_zero() {
            tokio::time::sleep(self.crawl_delay).await;
        }
        self.crawl_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Unknown("no scripted crawl response".into())))
    }

    async fn books(
        &self,
        _base_url: &str,
        source: BookSource,
        keyword: Option<&str>,
        _timeout: Duration,
    ) -> Result<BooksResponse, AppError> {
        self.books_calls.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source);
        self.books_keywords
            .lock()
            .unwrap()
            .push(keyword.map(str::to_string));
        self.books_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(BooksResponse {
                    success: true,
                    keyword: keyword.unwrap_or("全部").to_string(),
                    books: vec![],
                })
            })
    }

    async fn stats(&self, _base_url: &str, _timeout: Duration) -> Result<StoreStats, AppError> {
        Ok(StoreStats {
            success: true,
            status: "running".into(),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Gates, navigators, reporters
// ---------------------------------------------------------------------------

/// Confirmation gate with a fixed answer that counts how often it was asked.
#[derive(Default)]
pub struct FixedConfirm {
    answer: bool,
    asked: AtomicUsize,
}

impl FixedConfirm {
    pub fn yes() -> Self {
        Self {
            answer: true,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn no() -> Self {
        Self {
            answer: false,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl ConfirmGate for FixedConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Navigator that counts how often it fired.
#[derive(Default)]
pub struct RecordingNavigator {
    fired: AtomicUsize,
}

impl RecordingNavigator {
    pub fn count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_away(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

/// Monitor reporter that records event labels.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn count(&self, label: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == label)
            .count()
    }
}

impl LivenessReporter for RecordingReporter {
    fn report(&self, event: LivenessEvent<'_>) {
        let label = match &event {
            LivenessEvent::Started { .. } => "Started",
            LivenessEvent::Probing { .. } => "Probing",
            LivenessEvent::ProbeSkipped { .. } => "ProbeSkipped",
            LivenessEvent::StartupFailed { .. } => "StartupFailed",
            LivenessEvent::WentOffline { .. } => "WentOffline",
            LivenessEvent::Recovered => "Recovered",
            LivenessEvent::NavigationArmed { .. } => "NavigationArmed",
            LivenessEvent::NavigationFired => "NavigationFired",
            LivenessEvent::Stopped => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// `n` distinct book records for `keyword`.
pub fn make_books(keyword: &str, n: usize) -> Vec<Book> {
    (0..n)
        .map(|i| {
            Book::from(serde_json::json!({
                "标题": format!("{keyword} {i}"),
                "作者": "author",
                "现价": "¥10.00",
            }))
        })
        .collect()
}

/// Successful crawl response with the given counts and inline books.
pub fn make_crawl_response(
    keyword: &str,
    crawled: u64,
    saved: u64,
    duplicates: u64,
    books: Vec<Book>,
) -> CrawlResponse {
    CrawlResponse {
        success: true,
        keyword: keyword.to_string(),
        books,
        total_crawled: crawled,
        total_saved: saved,
        total_duplicates: duplicates,
        dedup_key: "标题 + 作者".to_string(),
    }
}

pub fn make_books_response(keyword: &str, books: Vec<Book>) -> BooksResponse {
    BooksResponse {
        success: true,
        keyword: keyword.to_string(),
        books,
    }
}
