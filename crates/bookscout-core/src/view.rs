use std::fmt;

use crate::models::{Book, ResultSet};
use crate::pager::PageWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Neutral information, e.g. "no matches".
    Info,
    /// A failed request.
    Error,
    /// The backend went away.
    Outage,
}

/// One-line message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn outage(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Outage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What the host currently displays.
#[derive(Debug, Clone, Default)]
pub struct SearchView {
    results: Option<ResultSet>,
    window: PageWindow,
    notice: Option<Notice>,
}

impl SearchView {
    pub fn new(page_size: usize) -> Self {
        Self {
            results: None,
            window: PageWindow::new(page_size),
            notice: None,
        }
    }

    pub fn results(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    /// True once a search has produced a result set (possibly empty).
    pub fn searched(&self) -> bool {
        self.results.is_some()
    }

    pub fn has_books(&self) -> bool {
        self.results.as_ref().is_some_and(|r| !r.is_empty())
    }

    fn count(&self) -> usize {
        self.results.as_ref().map_or(0, ResultSet::len)
    }

    /// Books on the current page.
    pub fn visible(&self) -> &[Book] {
        match &self.results {
            Some(rs) => self.window.visible(&rs.books),
            None => &[],
        }
    }

    pub fn total_pages(&self) -> usize {
        self.window.total_pages(self.count())
    }

    pub fn page_summary(&self) -> String {
        self.window.summary(self.count())
    }

    pub fn next_page(&mut self) -> bool {
        let count = self.count();
        self.window.next(count)
    }

    pub fn prev_page(&mut self) -> bool {
        self.window.prev()
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        let count = self.count();
        self.window.go_to(page, count)
    }

    /// Replace the displayed result set and go back to page 1.
    pub fn show(&mut self, results: ResultSet) {
        self.results = Some(results);
        self.window.reset();
    }

    /// Drop displayed results and derived search state, keep the notice.
    pub fn clear_results(&mut self) {
        self.results = None;
        self.window.reset();
    }

    /// Back to the initial state.
    pub fn clear(&mut self) {
        self.clear_results();
        self.notice = None;
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}
