//! Submission model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display format for submission dates.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Opaque unique identifier of a submission, stable across requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(String);

impl SubmissionId {
    /// Create an id from an existing value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-native point in time: milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from a calendar date-time.
    #[must_use]
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime.timestamp_millis())
    }

    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Epoch milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Convert to a calendar date-time, `None` when out of range.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

/// Format a timestamp as `YYYY-MM-DD HH:MM` (UTC).
///
/// Absent or unrepresentable timestamps format as an empty string.
#[must_use]
pub fn format_timestamp(timestamp: Option<Timestamp>) -> String {
    timestamp
        .and_then(Timestamp::to_datetime)
        .map(|datetime| datetime.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// A contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Unique identifier.
    pub id: SubmissionId,
    /// Sender name.
    pub name: Option<String>,
    /// Sender email address.
    pub email: Option<String>,
    /// Message body.
    pub message: Option<String>,
    /// When the document was created.
    pub created_at: Option<Timestamp>,
    /// Client-supplied submission time (older documents only carry this).
    pub timestamp: Option<Timestamp>,
    /// Whether an admin has marked the submission as read.
    pub read: bool,
}

impl Submission {
    /// Create an empty, unread submission with the given id.
    #[must_use]
    pub const fn new(id: SubmissionId) -> Self {
        Self {
            id,
            name: None,
            email: None,
            message: None,
            created_at: None,
            timestamp: None,
            read: false,
        }
    }

    /// The best known receive time: `created_at`, falling back to `timestamp`.
    #[must_use]
    pub fn received_at(&self) -> Option<Timestamp> {
        self.created_at.or(self.timestamp)
    }

    /// Human readable receive date, empty when unknown.
    #[must_use]
    pub fn display_date(&self) -> String {
        format_timestamp(self.received_at())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_id() {
        assert_eq!(format!("{}", SubmissionId::new("abc")), "abc");
    }

    #[test]
    fn format_known_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 59).unwrap();
        assert_eq!(
            format_timestamp(Some(Timestamp::from_datetime(dt))),
            "2024-03-09 14:05"
        );
    }

    #[test]
    fn format_missing_timestamp_is_empty() {
        assert_eq!(format_timestamp(None), "");
    }

    #[test]
    fn format_out_of_range_timestamp_is_empty() {
        assert_eq!(format_timestamp(Some(Timestamp::from_millis(i64::MAX))), "");
    }

    #[test]
    fn received_at_prefers_created_at() {
        let mut submission = Submission::new(SubmissionId::new("a"));
        submission.timestamp = Some(Timestamp::from_millis(1));
        assert_eq!(submission.received_at(), Some(Timestamp::from_millis(1)));

        submission.created_at = Some(Timestamp::from_millis(2));
        assert_eq!(submission.received_at(), Some(Timestamp::from_millis(2)));
    }

    #[test]
    fn display_date_uses_fallback() {
        let mut submission = Submission::new(SubmissionId::new("a"));
        assert_eq!(submission.display_date(), "");
        submission.timestamp = Some(Timestamp::from_millis(0));
        assert_eq!(submission.display_date(), "1970-01-01 00:00");
    }
}
