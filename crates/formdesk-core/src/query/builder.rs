//! Query builder.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use super::model::{Cursor, LATEST_WINDOW_HOURS, PAGE_SIZE, SortOptions, SubmissionQuery};
use crate::submission::Timestamp;

/// Builds listing queries from the user's selections.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    options: SortOptions,
    start_after: Option<Cursor>,
    limit: usize,
}

impl QueryBuilder {
    /// Start a query for the given selections, asking for one page plus the
    /// overfetch sentinel.
    #[must_use]
    pub const fn new(options: SortOptions) -> Self {
        Self {
            options,
            start_after: None,
            limit: PAGE_SIZE + 1,
        }
    }

    /// Resume after a page boundary.
    #[must_use]
    pub fn start_after(mut self, cursor: Option<Cursor>) -> Self {
        self.start_after = cursor;
        self
    }

    /// Build the query. `now` anchors the "latest only" window.
    #[must_use]
    pub fn build(self, now: DateTime<Utc>) -> SubmissionQuery {
        let created_since = self
            .options
            .latest_only
            .then(|| Timestamp::from_datetime(now - TimeDelta::hours(LATEST_WINDOW_HOURS)));

        debug!(
            "Built query: order by {} {}, since {:?}, after {:?}, limit {}",
            self.options.field.as_str(),
            self.options.direction.as_str(),
            created_since,
            self.start_after.as_ref().map(|cursor| &cursor.id),
            self.limit
        );

        SubmissionQuery {
            order_by: self.options.field,
            direction: self.options.direction,
            created_since,
            start_after: self.start_after,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::{SortDirection, SortField};
    use crate::submission::{Submission, SubmissionId};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn requests_one_extra_item() {
        let query = QueryBuilder::new(SortOptions::default()).build(now());
        assert_eq!(query.limit, PAGE_SIZE + 1);
        assert_eq!(query.order_by, SortField::CreatedAt);
        assert_eq!(query.direction, SortDirection::Descending);
        assert!(query.created_since.is_none());
        assert!(query.start_after.is_none());
    }

    #[test]
    fn latest_only_keeps_chosen_sort() {
        let options = SortOptions {
            field: SortField::Email,
            direction: SortDirection::Ascending,
            latest_only: true,
        };
        let query = QueryBuilder::new(options).build(now());

        assert_eq!(query.order_by, SortField::Email);
        assert_eq!(query.direction, SortDirection::Ascending);
        let since = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        assert_eq!(query.created_since, Some(Timestamp::from_datetime(since)));
    }

    #[test]
    fn carries_cursor() {
        let mut boundary = Submission::new(SubmissionId::new("b"));
        boundary.created_at = Some(Timestamp::from_millis(42));
        let cursor = Cursor::at(&boundary, SortField::CreatedAt);

        let query = QueryBuilder::new(SortOptions::default())
            .start_after(cursor.clone())
            .build(now());
        assert_eq!(query.start_after, cursor);
    }
}
