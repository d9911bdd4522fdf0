//! Query building for the submission listing.
//!
//! Three independent selections (sort field, sort direction and the
//! "latest only" switch) plus an optional page boundary cursor are turned
//! into a single [`SubmissionQuery`]. Every query asks for one item more than
//! a page holds; the extra item only signals that a next page exists.

mod builder;
mod model;

pub use builder::QueryBuilder;
pub use model::{
    Cursor, LATEST_WINDOW_HOURS, PAGE_SIZE, SortDirection, SortField, SortOptions, SortValue,
    SubmissionQuery,
};
