//! Submission model.
//!
//! Submissions are owned by the remote store; the browser only ever holds a
//! read-only copy of the current page.

mod model;

pub use model::{Submission, SubmissionId, Timestamp, format_timestamp};
