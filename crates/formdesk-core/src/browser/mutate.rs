//! Row mutations: toggling the read flag and confirmed deletes.
//!
//! Mutations are single attempts with no optimistic update. A failed write
//! leaves the cache untouched and records a dismissible [`Notice`].

use tracing::{debug, info, warn};

use super::navigator::SubmissionBrowser;
use crate::store::SubmissionStore;
use crate::submission::{Submission, SubmissionId};
use crate::{Error, Result};

/// Which mutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    /// Marking read or unread.
    ToggleRead,
    /// Deleting a submission.
    Delete,
}

impl MutationAction {
    /// Human-readable verb phrase.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ToggleRead => "update read status",
            Self::Delete => "delete submission",
        }
    }
}

/// A user-visible, dismissible report of a failed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// The failed action.
    pub action: MutationAction,
    /// Submission the action targeted.
    pub id: SubmissionId,
    /// Error description.
    pub message: String,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Could not {} ({}): {}",
            self.action.description(),
            self.id,
            self.message
        )
    }
}

impl<S: SubmissionStore> SubmissionBrowser<S> {
    /// The pending mutation failure, if any.
    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Dismiss the pending mutation failure.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Flip the `read` flag of a submission on the current page.
    ///
    /// Returns the new flag. The cached copy is updated only after the store
    /// accepted the write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is not on the current page, or
    /// the store error (also recorded as a [`Notice`]).
    pub async fn toggle_read(&mut self, id: &SubmissionId) -> Result<bool> {
        let read = !self.loaded_item(id)?.read;

        if let Err(err) = self.store.set_read(id, read).await {
            warn!("Failed to mark {id} read={read}: {err}");
            self.record_failure(MutationAction::ToggleRead, id, &err);
            return Err(err);
        }

        if let Some(item) = self.cache.item_mut(id) {
            item.read = read;
        }
        info!("Marked {id} as {}", if read { "read" } else { "unread" });
        Ok(read)
    }

    /// Delete a submission on the current page after `confirm` approves it.
    ///
    /// Returns `false` when the caller declined. After a delete, every cursor
    /// from the current page on is dropped (the ordering shifted under them)
    /// and the current page is reloaded; if it came back empty and isn't the
    /// first page, the browser steps back one page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is not on the current page, the
    /// store error (also recorded as a [`Notice`]), or a reload error.
    pub async fn delete<F>(&mut self, id: &SubmissionId, confirm: F) -> Result<bool>
    where
        F: FnOnce(&Submission) -> bool,
    {
        if !confirm(self.loaded_item(id)?) {
            debug!("Delete of {id} cancelled");
            return Ok(false);
        }

        if let Err(err) = self.store.delete(id).await {
            warn!("Failed to delete {id}: {err}");
            self.record_failure(MutationAction::Delete, id, &err);
            return Err(err);
        }
        info!("Deleted submission {id}");

        let page = self.cache.current_page();
        self.cache.invalidate_from(page);
        self.load_page(page).await?;
        if self.cache.items().is_empty() && page > 0 {
            self.go_prev().await?;
        }
        Ok(true)
    }

    fn loaded_item(&self, id: &SubmissionId) -> Result<&Submission> {
        self.cache
            .items()
            .iter()
            .find(|item| &item.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn record_failure(&mut self, action: MutationAction, id: &SubmissionId, err: &Error) {
        self.notice = Some(Notice {
            action,
            id: id.clone(),
            message: err.to_string(),
        });
    }
}
