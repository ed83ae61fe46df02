//! Pagination over a result list.
//!
//! A [`PageWindow`] only stores the current page and the page size; the item
//! count is passed in on every call, so the window never goes stale when the
//! list changes. Replacing the list does not reset the window by itself: the
//! owner calls [`PageWindow::reset`] (see [`crate::view::SearchView::show`]).

use std::ops::Range;

/// Default number of books per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    current_page: usize,
    page_size: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageWindow {
    /// A page size of zero is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size)
    }

    /// Index range of the current page, clipped to `count`.
    pub fn range(&self, count: usize) -> Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(count);
        let end = (self.current_page * self.page_size).min(count);
        start..end
    }

    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range(items.len())]
    }

    /// Moves back one page. Returns false (and does nothing) on page 1.
    pub fn prev(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Moves forward one page. Returns false on the last page.
    pub fn next(&mut self, count: usize) -> bool {
        if self.current_page < self.total_pages(count) {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Jumps to `page`. Out-of-range pages are ignored.
    pub fn go_to(&mut self, page: usize, count: usize) -> bool {
        if page >= 1 && page <= self.total_pages(count) {
            self.current_page = page;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// e.g. "showing 11-20 of 35".
    pub fn summary(&self, count: usize) -> String {
        let range = self.range(count);
        if range.is_empty() {
            return format!("showing 0 of {count}");
        }
        format!("showing {}-{} of {count}", range.start + 1, range.end)
    }
}
