//! Local text filter over the loaded page.
//!
//! This never fetches and never sees rows outside the current page.

use crate::submission::Submission;

/// Whether `submission` matches `search` (case-insensitive substring of the
/// name, email or message). An empty search matches everything.
#[must_use]
pub fn matches(submission: &Submission, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    [&submission.name, &submission.email, &submission.message]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// The items of a page that match `search`, in page order.
#[must_use]
pub fn filter_page<'a>(items: &'a [Submission], search: &str) -> Vec<&'a Submission> {
    items.iter().filter(|item| matches(item, search)).collect()
}
