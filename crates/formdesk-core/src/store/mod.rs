//! Submission storage.
//!
//! The browser talks to the remote document store through the narrow
//! [`SubmissionStore`] interface: one ordered range query, one point update
//! and one point delete. The handle is constructed by the caller and injected,
//! so tests can substitute [`MemoryStore`] or their own double.

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::Result;
use crate::query::SubmissionQuery;
use crate::submission::{Submission, SubmissionId};

/// Remote document store holding submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Run a listing query.
    ///
    /// Returns at most `query.limit` submissions that have the sort field,
    /// satisfy `created_since`, and lie strictly after `start_after`, ordered
    /// by `(order_by, id)` in `direction`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn fetch(&self, query: &SubmissionQuery) -> Result<Vec<Submission>>;

    /// Set the `read` flag of one submission.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for unknown ids, or a store error.
    async fn set_read(&self, id: &SubmissionId, read: bool) -> Result<()>;

    /// Delete one submission. Deleting an unknown id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    async fn delete(&self, id: &SubmissionId) -> Result<()>;
}

#[async_trait]
impl<T: SubmissionStore + ?Sized> SubmissionStore for Arc<T> {
    async fn fetch(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        (**self).fetch(query).await
    }

    async fn set_read(&self, id: &SubmissionId, read: bool) -> Result<()> {
        (**self).set_read(id, read).await
    }

    async fn delete(&self, id: &SubmissionId) -> Result<()> {
        (**self).delete(id).await
    }
}
