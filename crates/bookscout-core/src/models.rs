use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Host the backend is expected on.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when no candidate answers the health probe.
pub const DEFAULT_PORT: u16 = 8001;

/// Candidate ports, in priority order.
pub const CANDIDATE_PORTS: [u16; 6] = [8001, 8000, 8002, 8003, 8004, 8005];

/// Network address candidate for the backend service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:8001`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Site the backend scrapes for a crawl, and the store table it reads back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BookSource {
    /// Dangdang book listings.
    #[default]
    Dangdang,
    /// Fanqie web novels.
    Fanqie,
}

impl BookSource {
    pub fn crawl_path(self) -> &'static str {
        match self {
            BookSource::Dangdang => "/api/crawl",
            BookSource::Fanqie => "/api/crawl/fanqie",
        }
    }

    pub fn books_path(self) -> &'static str {
        match self {
            BookSource::Dangdang => "/api/books",
            BookSource::Fanqie => "/api/books/fanqie",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookSource::Dangdang => "dangdang",
            BookSource::Fanqie => "fanqie",
        }
    }
}

impl fmt::Display for BookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dangdang" | "dd" => Ok(BookSource::Dangdang),
            "fanqie" | "fq" => Ok(BookSource::Fanqie),
            other => Err(AppError::InvalidInput(format!(
                "unknown source '{other}', expected dangdang or fanqie"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of `POST /api/crawl` (and its Fanqie twin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub keyword: String,
    /// 0 means no limit.
    pub max_books: u32,
    pub proxy: Option<String>,
}

/// Response of `POST /api/crawl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub success: bool,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub total_crawled: u64,
    #[serde(default)]
    pub total_saved: u64,
    #[serde(default)]
    pub total_duplicates: u64,
    #[serde(default)]
    pub dedup_key: String,
}

/// Response of `GET /api/books`. An absent keyword comes back as "全部".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BooksResponse {
    pub success: bool,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub books: Vec<Book>,
}

/// Response of `GET /api/stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub total_books: u64,
    #[serde(default)]
    pub keywords: Vec<serde_json::Value>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Book records
// ---------------------------------------------------------------------------

/// A book record as stored by the backend.
///
/// Fields are opaque to the client; the accessors below know the keys the
/// backend uses (Chinese column names) with English fallbacks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Book(pub serde_json::Map<String, serde_json::Value>);

impl Book {
    /// Returns a field rendered as text, if present and non-empty.
    pub fn field(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Null => return None,
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.field(k))
    }

    pub fn title(&self) -> Option<String> {
        self.first_of(&["标题", "title"])
    }

    pub fn author(&self) -> Option<String> {
        self.first_of(&["作者", "author"])
    }

    pub fn price(&self) -> Option<String> {
        self.first_of(&["现价", "price", "原价"])
    }

    pub fn cover_url(&self) -> Option<String> {
        self.first_of(&["封面图", "cover_url", "cover"])
    }
}

impl From<serde_json::Value> for Book {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Book(map),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                Book(map)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Accounting reported by a completed crawl job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub total_crawled: u64,
    pub total_saved: u64,
    pub total_duplicates: u64,
    /// Fields the backend deduplicated on (e.g. "标题 + 作者").
    pub dedup_key: String,
}

impl From<&CrawlResponse> for CrawlOutcome {
    fn from(response: &CrawlResponse) -> Self {
        Self {
            total_crawled: response.total_crawled,
            total_saved: response.total_saved,
            total_duplicates: response.total_duplicates,
            dedup_key: response.dedup_key.clone(),
        }
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "crawled {}, saved {}, duplicates {}",
            self.total_crawled, self.total_saved, self.total_duplicates
        )
    }
}

/// Where a result set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSource {
    /// Crawl succeeded and the canonical stored list was fetched.
    CrawledAndStored(CrawlOutcome),
    /// Plain read of the store, no crawl.
    Store,
    /// Crawl succeeded but the store lookup failed; inline crawl list used.
    CrawledStoreLookupFailed(CrawlOutcome),
}

impl ResultSource {
    pub fn label(&self) -> &'static str {
        match self {
            ResultSource::CrawledAndStored(_) => "crawled+stored",
            ResultSource::Store => "store",
            ResultSource::CrawledStoreLookupFailed(_) => "crawled (store lookup failed)",
        }
    }

    pub fn crawl_outcome(&self) -> Option<&CrawlOutcome> {
        match self {
            ResultSource::CrawledAndStored(o) | ResultSource::CrawledStoreLookupFailed(o) => {
                Some(o)
            }
            ResultSource::Store => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ResultSource::CrawledStoreLookupFailed(_))
    }
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.crawl_outcome() {
            Some(outcome) => write!(f, "{} ({outcome})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

/// Ordered books for one search, replaced wholesale on each new search.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub keyword: String,
    pub books: Vec<Book>,
    pub source: ResultSource,
    pub site: BookSource,
}

impl ResultSet {
    pub fn new(keyword: impl Into<String>, books: Vec<Book>, source: ResultSource) -> Self {
        Self {
            keyword: keyword.into(),
            books,
            source,
            site: BookSource::default(),
        }
    }

    pub fn with_site(mut self, site: BookSource) -> Self {
        self.site = site;
        self
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// The search completed but matched nothing. Distinct from a failure.
    pub fn is_no_match(&self) -> bool {
        self.books.is_empty()
    }
}
