//! Paginated Submission Browser.
//!
//! Owns the page cache (boundary cursors, current page, loaded items) and is
//! the only component that mutates it. Navigation, option changes and row
//! mutations all take `&mut self`, so at most one fetch is ever in flight per
//! browser and cursors can't be written out of order.
//!
//! # Example
//!
//! ```ignore
//! use formdesk_core::{BrowserConfig, SortField, SqliteStore, SubmissionBrowser};
//!
//! let store = SqliteStore::new("submissions.db").await?;
//! let mut browser = SubmissionBrowser::new(store, BrowserConfig::default());
//! browser.load_page(0).await?;
//! browser.set_sort_field(SortField::Name).await?;
//! while browser.has_next() {
//!     browser.go_next().await?;
//! }
//! ```

mod config;
mod mutate;
mod navigator;
#[cfg(test)]
mod testing;

pub use config::BrowserConfig;
pub use mutate::{MutationAction, Notice};
pub use navigator::{FetchFailure, LoadState, PageCache, SubmissionBrowser};
