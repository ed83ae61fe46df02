use std::fmt;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{BookSource, CrawlRequest};

/// Largest number of books a single crawl may ask for.
pub const MAX_LIMIT: u32 = 500;

/// Limit substituted for negative input.
pub const DEFAULT_LIMIT: u32 = 20;

/// Longest keyword the backend accepts, in characters.
pub const MAX_KEYWORD_CHARS: usize = 50;

/// How many books a crawl may fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlLimit {
    /// Crawl everything the source has. Needs user confirmation.
    Unbounded,
    AtMost(u32),
}

impl CrawlLimit {
    /// Normalise raw user input: negative falls back to the default,
    /// 0 is unbounded, anything above [`MAX_LIMIT`] is clamped.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            n if n < 0 => CrawlLimit::AtMost(DEFAULT_LIMIT),
            0 => CrawlLimit::Unbounded,
            n => CrawlLimit::AtMost(n.min(MAX_LIMIT as i64) as u32),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, CrawlLimit::Unbounded)
    }

    /// Wire value for `max_books`.
    pub fn as_max_books(&self) -> u32 {
        match self {
            CrawlLimit::Unbounded => 0,
            CrawlLimit::AtMost(n) => *n,
        }
    }
}

impl fmt::Display for CrawlLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlLimit::Unbounded => f.write_str("unbounded"),
            CrawlLimit::AtMost(n) => write!(f, "{n}"),
        }
    }
}

/// A user-initiated crawl, as typed.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub keyword: String,
    pub limit: i64,
    pub proxy: Option<String>,
    pub source: BookSource,
}

impl CrawlJob {
    pub fn new(keyword: impl Into<String>, limit: i64) -> Self {
        Self {
            keyword: keyword.into(),
            limit,
            proxy: None,
            source: BookSource::default(),
        }
    }

    pub fn with_source(mut self, source: BookSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Check and normalise the job. Fails with [`AppError::InvalidInput`].
    pub fn validate(&self) -> Result<ValidatedJob, AppError> {
        let keyword = self.keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::InvalidInput("Please enter a search keyword".into()));
        }
        if keyword.chars().count() > MAX_KEYWORD_CHARS {
            return Err(AppError::InvalidInput(format!(
                "Keyword is too long, use at most {MAX_KEYWORD_CHARS} characters"
            )));
        }

        let proxy = self
            .proxy
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(ValidatedJob {
            keyword: keyword.to_string(),
            limit: CrawlLimit::from_raw(self.limit),
            proxy,
            source: self.source,
        })
    }
}

/// A crawl job that passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedJob {
    pub keyword: String,
    pub limit: CrawlLimit,
    pub proxy: Option<String>,
    pub source: BookSource,
}

impl ValidatedJob {
    pub fn to_request(&self) -> CrawlRequest {
        CrawlRequest {
            keyword: self.keyword.clone(),
            max_books: self.limit.as_max_books(),
            proxy: self.proxy.clone(),
        }
    }
}

/// Timeouts for the orchestrator's backend calls.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Bound on the crawl phase. Scraping is slow.
    pub crawl_timeout: Duration,
    /// Bound on store reads.
    pub store_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            crawl_timeout: Duration::from_secs(180),
            store_timeout: Duration::from_secs(30),
        }
    }
}

impl CrawlConfig {
    pub fn with_crawl_timeout(mut self, timeout: Duration) -> Self {
        self.crawl_timeout = timeout;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}
