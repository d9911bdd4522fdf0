//! Query model types.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::submission::{Submission, SubmissionId, Timestamp};

/// Number of submissions shown per page.
pub const PAGE_SIZE: usize = 8;

/// Width of the "latest only" window, in hours.
pub const LATEST_WINDOW_HOURS: i64 = 24;

/// Field the listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortField {
    /// Document creation time.
    #[default]
    CreatedAt,
    /// Client-supplied submission time.
    Timestamp,
    /// Sender name.
    Name,
    /// Sender email.
    Email,
}

impl SortField {
    /// All sort fields, in menu order.
    pub const ALL: [Self; 4] = [Self::CreatedAt, Self::Timestamp, Self::Name, Self::Email];

    /// Parse a user or config supplied field name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "createdat" | "created_at" | "created" | "date" => Some(Self::CreatedAt),
            "timestamp" | "time" => Some(Self::Timestamp),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    /// Document field name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Timestamp => "timestamp",
            Self::Name => "name",
            Self::Email => "email",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::CreatedAt => "Date",
            Self::Timestamp => "Timestamp",
            Self::Name => "Name",
            Self::Email => "Email",
        }
    }

    /// The sort key of a submission under this field, if it has one.
    #[must_use]
    pub fn key_of(&self, submission: &Submission) -> Option<SortValue> {
        match self {
            Self::CreatedAt => submission.created_at.map(SortValue::Time),
            Self::Timestamp => submission.timestamp.map(SortValue::Time),
            Self::Name => submission.name.clone().map(SortValue::Text),
            Self::Email => submission.email.clone().map(SortValue::Text),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

impl SortDirection {
    /// Parse `asc`/`desc` (or the long forms).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }

    /// Short form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Ascending => "Ascending",
            Self::Descending => "Descending",
        }
    }

    /// Orient a natural (ascending) ordering.
    #[must_use]
    pub const fn apply(&self, natural: Ordering) -> Ordering {
        match self {
            Self::Ascending => natural,
            Self::Descending => natural.reverse(),
        }
    }
}

/// The user's listing selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOptions {
    /// Field to order by.
    pub field: SortField,
    /// Ordering direction.
    pub direction: SortDirection,
    /// Only show submissions created within the last [`LATEST_WINDOW_HOURS`].
    pub latest_only: bool,
}

/// A sort key value.
///
/// Values of different kinds never meet in one query, since a query orders
/// by a single field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SortValue {
    /// A point in time.
    Time(Timestamp),
    /// A text value, compared bytewise.
    Text(String),
}

/// Position of a page boundary item under a given ordering.
///
/// Only valid for the ordering and filter it was captured under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Sort key of the boundary item.
    pub value: SortValue,
    /// Id of the boundary item, the tie-breaker for equal keys.
    pub id: SubmissionId,
}

impl Cursor {
    /// Capture the position of `submission` under `field`.
    ///
    /// Returns `None` when the submission has no value for `field`.
    #[must_use]
    pub fn at(submission: &Submission, field: SortField) -> Option<Self> {
        field.key_of(submission).map(|value| Self {
            value,
            id: submission.id.clone(),
        })
    }
}

/// A fully built listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionQuery {
    /// Field to order by; documents without it are not returned.
    pub order_by: SortField,
    /// Ordering direction, also applied to the id tie-breaker.
    pub direction: SortDirection,
    /// Inclusive lower bound on `created_at`.
    pub created_since: Option<Timestamp>,
    /// Return only items strictly after this position.
    pub start_after: Option<Cursor>,
    /// Maximum number of items to return.
    pub limit: usize,
}

impl SubmissionQuery {
    /// Whether `submission` belongs to the result set, ignoring the limit.
    #[must_use]
    pub fn admits(&self, submission: &Submission) -> bool {
        let Some(key) = self.order_by.key_of(submission) else {
            return false;
        };

        if let Some(since) = self.created_since
            && !submission.created_at.is_some_and(|created| created >= since)
        {
            return false;
        }

        self.start_after.as_ref().is_none_or(|cursor| {
            self.compare_positions((&key, &submission.id), (&cursor.value, &cursor.id))
                == Ordering::Greater
        })
    }

    /// Order two admitted submissions the way the query returns them.
    #[must_use]
    pub fn compare(&self, a: &Submission, b: &Submission) -> Ordering {
        let natural = self
            .order_by
            .key_of(a)
            .cmp(&self.order_by.key_of(b))
            .then_with(|| a.id.cmp(&b.id));
        self.direction.apply(natural)
    }

    fn compare_positions(
        &self,
        (value_a, id_a): (&SortValue, &SubmissionId),
        (value_b, id_b): (&SortValue, &SubmissionId),
    ) -> Ordering {
        self.direction
            .apply(value_a.cmp(value_b).then_with(|| id_a.cmp(id_b)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn named(id: &str, name: &str) -> Submission {
        let mut submission = Submission::new(SubmissionId::new(id));
        submission.name = Some(name.to_string());
        submission
    }

    fn by_name(direction: SortDirection, start_after: Option<Cursor>) -> SubmissionQuery {
        SubmissionQuery {
            order_by: SortField::Name,
            direction,
            created_since: None,
            start_after,
            limit: PAGE_SIZE + 1,
        }
    }

    #[test]
    fn parse_fields() {
        assert_eq!(SortField::parse("date"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("createdAt"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("TIMESTAMP"), Some(SortField::Timestamp));
        assert_eq!(SortField::parse("name"), Some(SortField::Name));
        assert_eq!(SortField::parse("email"), Some(SortField::Email));
        assert_eq!(SortField::parse("subject"), None);
    }

    #[test]
    fn parse_directions() {
        assert_eq!(SortDirection::parse("asc"), Some(SortDirection::Ascending));
        assert_eq!(SortDirection::parse("Descending"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::parse("up"), None);
    }

    #[test]
    fn defaults_match_initial_listing() {
        let options = SortOptions::default();
        assert_eq!(options.field, SortField::CreatedAt);
        assert_eq!(options.direction, SortDirection::Descending);
        assert!(!options.latest_only);
    }

    #[test]
    fn missing_sort_key_is_not_admitted() {
        let query = by_name(SortDirection::Ascending, None);
        assert!(!query.admits(&Submission::new(SubmissionId::new("x"))));
        assert!(query.admits(&named("x", "Ann")));
    }

    #[test]
    fn cursor_breaks_ties_by_id() {
        let boundary = named("b", "Sam");
        let cursor = Cursor::at(&boundary, SortField::Name).unwrap();
        let query = by_name(SortDirection::Ascending, Some(cursor));

        assert!(!query.admits(&named("a", "Sam")));
        assert!(!query.admits(&boundary));
        assert!(query.admits(&named("c", "Sam")));
        assert!(query.admits(&named("a", "Tom")));
        assert!(!query.admits(&named("z", "Ann")));
    }

    #[test]
    fn descending_cursor_admits_smaller_keys() {
        let cursor = Cursor::at(&named("m", "Mia"), SortField::Name).unwrap();
        let query = by_name(SortDirection::Descending, Some(cursor));

        assert!(query.admits(&named("a", "Ann")));
        assert!(query.admits(&named("l", "Mia")));
        assert!(!query.admits(&named("n", "Mia")));
        assert!(!query.admits(&named("a", "Zoe")));
    }

    #[test]
    fn created_since_requires_created_at() {
        let mut query = by_name(SortDirection::Ascending, None);
        query.created_since = Some(Timestamp::from_millis(100));

        let mut fresh = named("a", "Ann");
        fresh.created_at = Some(Timestamp::from_millis(100));
        let mut stale = named("b", "Bob");
        stale.created_at = Some(Timestamp::from_millis(99));
        let mut undated = named("c", "Cat");
        undated.timestamp = Some(Timestamp::from_millis(500));

        assert!(query.admits(&fresh));
        assert!(!query.admits(&stale));
        assert!(!query.admits(&undated));
    }

    #[test]
    fn compare_follows_direction() {
        let ann = named("1", "Ann");
        let bob = named("2", "Bob");
        assert_eq!(
            by_name(SortDirection::Ascending, None).compare(&ann, &bob),
            Ordering::Less
        );
        assert_eq!(
            by_name(SortDirection::Descending, None).compare(&ann, &bob),
            Ordering::Greater
        );
    }
}
