//! Text rendering of the submissions view.

use std::fmt::Write as _;

use formdesk_core::{
    LATEST_WINDOW_HOURS, LoadState, PAGE_SIZE, Submission, SubmissionBrowser, SubmissionStore,
};

const MESSAGE_WIDTH: usize = 40;

/// Shown while a page fetch is outstanding.
pub const LOADING: &str = "Loading...";

/// Cuts `text` to `width` characters, marking the cut with `...`.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// `Page N - showing X of 8`, with N counted from one.
#[must_use]
pub fn status_line(page: usize, visible: usize) -> String {
    format!("Page {} - showing {visible} of {PAGE_SIZE}", page + 1)
}

/// Table of rows, numbered from one.
#[must_use]
pub fn table(rows: &[&Submission]) -> String {
    let cells: Vec<[String; 6]> = rows
        .iter()
        .enumerate()
        .map(|(i, s)| {
            [
                (i + 1).to_string(),
                s.name.clone().unwrap_or_default(),
                s.email.clone().unwrap_or_default(),
                truncate(
                    &s.message.as_deref().unwrap_or_default().replace('\n', " "),
                    MESSAGE_WIDTH,
                ),
                s.display_date(),
                if s.read { "Read" } else { "Unread" }.to_string(),
            ]
        })
        .collect();

    let header = ["#", "Name", "Email", "Message", "Date", "Status"];
    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &cells {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

/// The whole submissions screen for the browser's current state.
pub fn screen<S: SubmissionStore>(browser: &SubmissionBrowser<S>) -> String {
    let options = browser.options();
    let mut out = String::new();

    let _ = write!(
        out,
        "Sorted by {} ({})",
        options.field.display_name(),
        options.direction.display_name()
    );
    if options.latest_only {
        let _ = write!(out, " - last {LATEST_WINDOW_HOURS} hours");
    }
    if !browser.search().is_empty() {
        let _ = write!(out, " - search \"{}\"", browser.search());
    }
    out.push('\n');

    match browser.state() {
        LoadState::Idle => {}
        // Only seen when a fetch was abandoned before it settled.
        LoadState::Loading { .. } => {
            out.push_str(LOADING);
            out.push('\n');
        }
        LoadState::Failed(failure) => {
            let _ = writeln!(
                out,
                "Could not load page {}: {} (type 'retry')",
                failure.page + 1,
                failure.message
            );
        }
        LoadState::Loaded => {
            let visible = browser.visible();
            if visible.is_empty() {
                out.push_str("No submissions\n");
            } else {
                out.push_str(&table(&visible));
            }
            let mut nav = status_line(browser.current_page(), visible.len());
            if browser.has_prev() {
                nav.push_str("  [prev]");
            }
            if browser.has_next() {
                nav.push_str("  [next]");
            }
            out.push_str(&nav);
            out.push('\n');
        }
    }

    if let Some(notice) = browser.notice() {
        let _ = writeln!(out, "! {notice} (type 'dismiss')");
    }
    out
}
