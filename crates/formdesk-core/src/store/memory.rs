//! In-process submission store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::SubmissionStore;
use crate::query::SubmissionQuery;
use crate::submission::{Submission, SubmissionId};
use crate::{Error, Result};

/// A store holding submissions in memory, evaluating queries locally.
#[derive(Debug, Default)]
pub struct MemoryStore {
    submissions: Mutex<Vec<Submission>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with submissions.
    #[must_use]
    pub fn with_submissions(submissions: Vec<Submission>) -> Self {
        Self {
            submissions: Mutex::new(submissions),
        }
    }

    /// Add or replace a submission.
    pub async fn insert(&self, submission: Submission) {
        let mut submissions = self.submissions.lock().await;
        submissions.retain(|existing| existing.id != submission.id);
        submissions.push(submission);
    }

    /// Look up a submission by id.
    pub async fn get(&self, id: &SubmissionId) -> Option<Submission> {
        self.submissions
            .lock()
            .await
            .iter()
            .find(|submission| &submission.id == id)
            .cloned()
    }

    /// Number of stored submissions.
    pub async fn len(&self) -> usize {
        self.submissions.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.submissions.lock().await.is_empty()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn fetch(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        let submissions = self.submissions.lock().await;
        let mut matching: Vec<Submission> = submissions
            .iter()
            .filter(|submission| query.admits(submission))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));
        matching.truncate(query.limit);
        Ok(matching)
    }

    async fn set_read(&self, id: &SubmissionId, read: bool) -> Result<()> {
        let mut submissions = self.submissions.lock().await;
        let submission = submissions
            .iter_mut()
            .find(|submission| &submission.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        submission.read = read;
        Ok(())
    }

    async fn delete(&self, id: &SubmissionId) -> Result<()> {
        self.submissions
            .lock()
            .await
            .retain(|submission| &submission.id != id);
        Ok(())
    }
}
