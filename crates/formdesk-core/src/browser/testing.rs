//! Test doubles for browser tests.

#![allow(clippy::unwrap_used, missing_docs)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use crate::query::SubmissionQuery;
use crate::store::{MemoryStore, SubmissionStore};
use crate::submission::{Submission, SubmissionId, Timestamp};
use crate::{Error, Result};

/// Epoch millis well in the past, so "latest only" excludes these items.
const BASE_MILLIS: i64 = 1_700_000_000_000;

/// A memory store that records queries and fails or hangs on request.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    pub inner: MemoryStore,
    queries: Mutex<Vec<SubmissionQuery>>,
    failing_fetches: AtomicU32,
    hang: AtomicBool,
    fail_mutations: AtomicBool,
    set_read_calls: AtomicU32,
    delete_calls: AtomicU32,
}

impl ScriptedStore {
    pub fn new(submissions: Vec<Submission>) -> Self {
        Self {
            inner: MemoryStore::with_submissions(submissions),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<SubmissionQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn fail_next_fetches(&self, count: u32) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    pub fn hang_fetches(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn set_read_calls(&self) -> u32 {
        self.set_read_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionStore for ScriptedStore {
    async fn fetch(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let failing = self.failing_fetches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_fetches.store(failing - 1, Ordering::SeqCst);
            return Err(Error::Unavailable("scripted outage".into()));
        }
        self.inner.fetch(query).await
    }

    async fn set_read(&self, id: &SubmissionId, read: bool) -> Result<()> {
        self.set_read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("scripted write failure".into()));
        }
        self.inner.set_read(id, read).await
    }

    async fn delete(&self, id: &SubmissionId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("scripted write failure".into()));
        }
        self.inner.delete(id).await
    }
}

/// A submission with the given creation time and a matching name/email.
pub fn dated(id: &str, created_millis: i64) -> Submission {
    Submission {
        id: SubmissionId::new(id),
        name: Some(format!("Name {id}")),
        email: Some(format!("{id}@example.com")),
        message: Some(format!("Message from {id}")),
        created_at: Some(Timestamp::from_millis(created_millis)),
        timestamp: Some(Timestamp::from_millis(created_millis)),
        read: false,
    }
}

/// `item01..itemNN`, newest first by creation date.
pub fn numbered(count: usize) -> Vec<Submission> {
    (1..=count)
        .map(|n| {
            let age = i64::try_from(n).unwrap() * 60_000;
            dated(&format!("item{n:02}"), BASE_MILLIS - age)
        })
        .collect()
}

pub fn ids<'a>(items: impl IntoIterator<Item = &'a Submission>) -> Vec<String> {
    items.into_iter().map(|item| item.id.to_string()).collect()
}
