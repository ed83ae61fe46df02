//! Crawl-then-reconcile protocol.
//!
//! A crawl asks the backend to scrape and store books, then reads the store
//! back so the displayed list is the canonical, deduplicated one. If the
//! read-back fails the crawl's own inline list is shown instead, labelled as
//! a fallback.

use std::sync::Arc;

use crate::context::ClientContext;
use crate::error::AppError;
use crate::job::{CrawlConfig, CrawlJob, ValidatedJob};
use crate::liveness::{LivenessMonitor, LivenessState};
use crate::models::{Book, BookSource, CrawlOutcome, ResultSet, ResultSource, StoreStats};
use crate::traits::{Backend, ConfirmGate};
use crate::view::{Notice, NoticeKind};

/// Label for a store listing without a keyword, as the backend echoes it.
const ALL_BOOKS: &str = "全部";

const UNBOUNDED_PROMPT: &str =
    "A limit of 0 crawls every matching book and may take a long time. Continue?";

pub struct CrawlOrchestrator<B: Backend, G: ConfirmGate> {
    backend: B,
    ctx: Arc<ClientContext>,
    monitor: Arc<LivenessMonitor<B>>,
    gate: G,
    config: CrawlConfig,
}

impl<B: Backend, G: ConfirmGate> CrawlOrchestrator<B, G> {
    pub fn new(
        backend: B,
        ctx: Arc<ClientContext>,
        monitor: Arc<LivenessMonitor<B>>,
        gate: G,
        config: CrawlConfig,
    ) -> Self {
        Self {
            backend,
            ctx,
            monitor,
            gate,
            config,
        }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Crawl for `job.keyword`, then publish the stored list.
    ///
    /// Local rejections (offline, invalid input, declined, busy) happen
    /// before any network traffic.
    pub async fn submit(&self, job: CrawlJob) -> Result<ResultSet, AppError> {
        self.ensure_online()?;

        let job = job.validate().inspect_err(|e| self.report_failure(e))?;

        if job.limit.is_unbounded() && !self.gate.confirm(UNBOUNDED_PROMPT) {
            tracing::info!(keyword = %job.keyword, "Unbounded crawl declined");
            return Err(AppError::Declined);
        }

        let _busy = self.ctx.try_begin().inspect_err(|e| self.report_failure(e))?;

        self.ctx.view().clear_results();
        tracing::info!(
            keyword = %job.keyword,
            limit = %job.limit,
            source = %job.source,
            "Starting crawl"
        );

        let (outcome, inline) = match self.crawl_phase(&job).await {
            Ok(crawled) => crawled,
            Err(e) => return Err(self.fail(e).await),
        };
        tracing::info!(keyword = %job.keyword, %outcome, "Crawl finished");

        let results = self
            .reconcile(job.source, &job.keyword, outcome, inline)
            .await;
        let no_match = format!("No books found for '{}'", results.keyword);
        self.publish(results, no_match)
    }

    /// Read the store without crawling. `None` lists every stored book.
    ///
    /// A failure leaves the currently displayed results in place.
    pub async fn list(
        &self,
        source: BookSource,
        keyword: Option<&str>,
    ) -> Result<ResultSet, AppError> {
        self.ensure_online()?;
        let _busy = self.ctx.try_begin().inspect_err(|e| self.report_failure(e))?;

        let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
        let base_url = self.ctx.base_url();
        let fetched = self
            .backend
            .books(&base_url, source, keyword, self.config.store_timeout)
            .await
            .and_then(|response| {
                if response.success {
                    Ok(response)
                } else {
                    Err(AppError::BackendRejected {
                        status_code: 200,
                        detail: "store lookup reported failure".into(),
                    })
                }
            });

        let response = match fetched {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e).await),
        };

        // The backend names the whole store "全部" when no keyword is sent.
        let label = match response.keyword.trim() {
            "" => keyword.unwrap_or(ALL_BOOKS).to_string(),
            echoed => echoed.to_string(),
        };
        let results =
            ResultSet::new(label, response.books, ResultSource::Store).with_site(source);
        tracing::info!(
            keyword = ?keyword,
            %source,
            count = results.len(),
            "Listed stored books"
        );

        let no_match = match keyword {
            Some(k) => format!("No stored books for '{k}', crawl it first"),
            None => "The store is empty, crawl some books first".to_string(),
        };
        self.publish(results, no_match)
    }

    /// Store totals. Does not touch the view or the busy flag.
    pub async fn stats(&self) -> Result<StoreStats, AppError> {
        self.ensure_online()?;
        let base_url = self.ctx.base_url();
        match self
            .backend
            .stats(&base_url, self.config.store_timeout)
            .await
        {
            Ok(stats) => Ok(stats),
            Err(e) if e.is_transport() => {
                if self.monitor.check_now().await == LivenessState::Offline {
                    Err(AppError::Offline)
                } else {
                    Err(e)
                }
            }
            Err(e) => Err(e),
        }
    }

    fn ensure_online(&self) -> Result<(), AppError> {
        if self.monitor.is_online() {
            return Ok(());
        }
        let err = AppError::Offline;
        self.report_failure(&err);
        Err(err)
    }

    async fn crawl_phase(&self, job: &ValidatedJob) -> Result<(CrawlOutcome, Vec<Book>), AppError> {
        let base_url = self.ctx.base_url();
        let response = self
            .backend
            .crawl(
                &base_url,
                job.source,
                &job.to_request(),
                self.config.crawl_timeout,
            )
            .await?;

        if !response.success {
            return Err(AppError::BackendRejected {
                status_code: 200,
                detail: "crawl reported failure".into(),
            });
        }
        Ok((CrawlOutcome::from(&response), response.books))
    }

    /// Read back the stored list for `keyword`, falling back to the crawl's
    /// inline books on any failure.
    async fn reconcile(
        &self,
        source: BookSource,
        keyword: &str,
        outcome: CrawlOutcome,
        inline: Vec<Book>,
    ) -> ResultSet {
        let base_url = self.ctx.base_url();
        let results = match self
            .backend
            .books(&base_url, source, Some(keyword), self.config.store_timeout)
            .await
        {
            Ok(response) if response.success => ResultSet::new(
                keyword,
                response.books,
                ResultSource::CrawledAndStored(outcome),
            ),
            Ok(_) => {
                tracing::warn!(keyword, "Store lookup reported failure, using crawl results");
                ResultSet::new(keyword, inline, ResultSource::CrawledStoreLookupFailed(outcome))
            }
            Err(e) => {
                tracing::warn!(keyword, error = %e, "Store lookup failed, using crawl results");
                ResultSet::new(keyword, inline, ResultSource::CrawledStoreLookupFailed(outcome))
            }
        };
        results.with_site(source)
    }

    /// Put `results` on screen, with `no_match` as the notice when empty.
    ///
    /// If the monitor declared an outage while the request was in flight,
    /// its cleared view and outage notice stand and the late answer is
    /// dropped. The check runs under the view lock, so an outage landing
    /// afterwards still clears what was shown.
    fn publish(&self, results: ResultSet, no_match: String) -> Result<ResultSet, AppError> {
        let mut view = self.ctx.view();
        if !self.monitor.is_online() {
            tracing::warn!(
                keyword = %results.keyword,
                count = results.len(),
                "Backend went offline during the request, dropping its answer"
            );
            view.clear_results();
            return Err(AppError::Offline);
        }

        if results.is_no_match() {
            view.set_notice(Notice::info(no_match));
        } else if view.notice().is_some_and(|n| n.kind != NoticeKind::Outage) {
            view.clear_notice();
        }
        view.show(results.clone());
        Ok(results)
    }

    /// Classify a network-phase failure and leave the view consistent.
    async fn fail(&self, err: AppError) -> AppError {
        let err = match err {
            AppError::TransportFailure(raw) => {
                tracing::warn!(error = %raw, "Transport failure, re-checking backend");
                if self.monitor.check_now().await == LivenessState::Offline {
                    self.ctx.view().clear_results();
                    AppError::Offline
                } else {
                    AppError::Unknown(raw)
                }
            }
            e @ (AppError::Timeout(_) | AppError::BackendRejected { .. }) => e,
            other => AppError::Unknown(other.to_string()),
        };
        tracing::warn!(error = %err, "Request failed");
        self.report_failure(&err);
        err
    }

    /// Surface `err` in the view. An outage notice from the monitor is
    /// never overwritten.
    fn report_failure(&self, err: &AppError) {
        let mut view = self.ctx.view();
        if view.notice().is_some_and(|n| n.kind == NoticeKind::Outage) {
            return;
        }
        view.set_notice(Notice::error(err.user_message()));
    }
}
