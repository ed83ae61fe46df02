use std::fmt::Write;

use bookscout_core::{Book, NoticeKind, SearchView, StoreStats};

/// Text rendering of the current view.
pub fn view(view: &SearchView) -> String {
    let mut out = String::new();

    if let Some(notice) = view.notice() {
        let tag = match notice.kind {
            NoticeKind::Info => "info",
            NoticeKind::Error => "error",
            NoticeKind::Outage => "offline",
        };
        let _ = writeln!(out, "[{tag}] {notice}");
    }

    let Some(results) = view.results() else {
        return out;
    };
    let _ = writeln!(
        out,
        "'{}' ({}): {}",
        results.keyword, results.site, results.source
    );
    if results.is_no_match() {
        return out;
    }

    let offset = view.window().range(results.len()).start;
    for (i, book) in view.visible().iter().enumerate() {
        let _ = writeln!(out, "{:>4}. {}", offset + i + 1, book_line(book));
    }
    let _ = writeln!(
        out,
        "page {}/{}, {}",
        view.window().current_page(),
        view.total_pages(),
        view.page_summary()
    );
    out
}

pub fn book_line(book: &Book) -> String {
    let title = book.title().unwrap_or_else(|| "(untitled)".to_string());
    let mut line = title;
    if let Some(author) = book.author() {
        line.push_str(" | ");
        line.push_str(&author);
    }
    if let Some(price) = book.price() {
        line.push_str(" | ");
        line.push_str(&price);
    }
    line
}

pub fn stats(stats: &StoreStats) -> String {
    let mut out = format!(
        "status: {}\ntotal books: {}\n",
        stats.status, stats.total_books
    );
    for entry in &stats.keywords {
        let keyword = entry
            .get("keyword")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        match entry.get("count").and_then(|v| v.as_u64()) {
            Some(count) => {
                let _ = writeln!(out, "  {keyword}: {count}");
            }
            None => {
                let _ = writeln!(out, "  {keyword}");
            }
        }
    }
    if let Some(error) = &stats.error {
        let _ = writeln!(out, "error: {error}");
    }
    out
}
