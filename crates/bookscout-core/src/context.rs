//! Process-scoped state shared by the resolver's caller, the liveness
//! monitor and the crawl orchestrator.
//!
//! Created once by the host and handed to each component as an
//! `Arc<ClientContext>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use crate::error::AppError;
use crate::models::Endpoint;
use crate::pager::DEFAULT_PAGE_SIZE;
use crate::view::{Notice, SearchView};

#[derive(Debug, Clone)]
struct Resolution {
    endpoint: Endpoint,
    resolved: bool,
}

#[derive(Debug)]
pub struct ClientContext {
    resolution: RwLock<Resolution>,
    view: Mutex<SearchView>,
    busy: AtomicBool,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::new(Endpoint::default(), DEFAULT_PAGE_SIZE)
    }
}

impl ClientContext {
    /// Start unresolved on `fallback`.
    pub fn new(fallback: Endpoint, page_size: usize) -> Self {
        Self {
            resolution: RwLock::new(Resolution {
                endpoint: fallback,
                resolved: false,
            }),
            view: Mutex::new(SearchView::new(page_size)),
            busy: AtomicBool::new(false),
        }
    }

    /// Store the resolver's answer. `None` keeps the fallback endpoint and
    /// leaves the context unresolved.
    pub fn set_resolution(&self, selected: Option<Endpoint>) {
        let mut res = self
            .resolution
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match selected {
            Some(endpoint) => {
                res.endpoint = endpoint;
                res.resolved = true;
            }
            None => res.resolved = false,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.resolution
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .endpoint
            .clone()
    }

    pub fn base_url(&self) -> String {
        self.endpoint().base_url()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .resolved
    }

    /// Locks the displayed view, recovering from poison if necessary.
    pub fn view(&self) -> MutexGuard<'_, SearchView> {
        self.view.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned view mutex");
            poisoned.into_inner()
        })
    }

    /// Clone of the current view, for rendering without holding the lock.
    pub fn snapshot(&self) -> SearchView {
        self.view().clone()
    }

    pub fn set_notice(&self, notice: Notice) {
        self.view().set_notice(notice);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Mark an operation as in flight. Fails with [`AppError::Busy`] if one
    /// already is. The flag is released when the guard drops.
    pub fn try_begin(&self) -> Result<BusyGuard<'_>, AppError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| AppError::Busy)?;
        Ok(BusyGuard { ctx: self })
    }

    /// The normal heartbeat only probes when something is on screen or
    /// an operation is running.
    pub fn has_reason_to_probe(&self) -> bool {
        self.is_busy() || self.view().has_books()
    }
}

/// Releases the busy flag on drop, on every exit path.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    ctx: &'a ClientContext,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.ctx.busy.store(false, Ordering::SeqCst);
    }
}
