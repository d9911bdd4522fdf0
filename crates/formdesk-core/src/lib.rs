//! # formdesk-core
//!
//! Core logic for the `formdesk` admin console.
//!
//! This crate provides:
//! - Submission model and date formatting
//! - Query building (sort field, direction, "latest only", cursors)
//! - The `SubmissionStore` interface and a `SQLite` implementation
//! - **Submission Browser** - cursor-paginated page loading and navigation
//! - Row mutations (toggle read, confirmed delete)
//! - Local page filtering
//! - CSV export of visible rows

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod browser;
mod error;
pub mod export;
pub mod filter;
pub mod query;
pub mod retry;
pub mod store;
pub mod submission;

pub use browser::{
    BrowserConfig, FetchFailure, LoadState, MutationAction, Notice, PageCache, SubmissionBrowser,
};
pub use error::{Error, Result};
pub use export::{CSV_CONTENT_TYPE, CsvRow, DEFAULT_EXPORT_FILE, ExportRow, to_csv};
pub use filter::{filter_page, matches};
pub use query::{
    Cursor, LATEST_WINDOW_HOURS, PAGE_SIZE, QueryBuilder, SortDirection, SortField, SortOptions,
    SortValue, SubmissionQuery,
};
pub use retry::RetryPolicy;
pub use store::{MemoryStore, SqliteStore, SubmissionStore};
pub use submission::{Submission, SubmissionId, Timestamp, format_timestamp};
