//! CSV export of the visible rows.
//!
//! The first line holds the key names of the first row joined by commas.
//! Every following line holds one row's values, each enclosed in double
//! quotes with embedded quotes doubled. Absent values become empty strings.
//! Lines are separated by `\n` with no newline after the last one.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::submission::Submission;
use crate::{Error, Result};

/// Content type of the exported bytes.
pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

/// Default file name for exports.
pub const DEFAULT_EXPORT_FILE: &str = "submissions.csv";

/// A row that can be written as CSV.
pub trait CsvRow {
    /// Column names of this row, in output order.
    fn keys(&self) -> Vec<String>;

    /// Value of the named column, `None` when absent.
    fn value(&self, key: &str) -> Option<String>;
}

/// The exported shape of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    /// Submission id.
    pub id: String,
    /// Sender name, empty when unknown.
    pub name: String,
    /// Sender email, empty when unknown.
    pub email: String,
    /// Message body, empty when unknown.
    pub message: String,
    /// Formatted receive date, empty when unknown.
    pub date: String,
    /// Read flag.
    pub read: bool,
}

impl ExportRow {
    const KEYS: [&'static str; 6] = ["id", "name", "email", "message", "date", "read"];
}

impl From<&Submission> for ExportRow {
    fn from(submission: &Submission) -> Self {
        Self {
            id: submission.id.to_string(),
            name: submission.name.clone().unwrap_or_default(),
            email: submission.email.clone().unwrap_or_default(),
            message: submission.message.clone().unwrap_or_default(),
            date: submission.display_date(),
            read: submission.read,
        }
    }
}

impl CsvRow for ExportRow {
    fn keys(&self) -> Vec<String> {
        Self::KEYS.iter().map(ToString::to_string).collect()
    }

    fn value(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "email" => Some(self.email.clone()),
            "message" => Some(self.message.clone()),
            "date" => Some(self.date.clone()),
            "read" => Some(self.read.to_string()),
            _ => None,
        }
    }
}

impl<K: AsRef<str>, V: AsRef<str>> CsvRow for Vec<(K, Option<V>)> {
    fn keys(&self) -> Vec<String> {
        self.iter().map(|(key, _)| key.as_ref().to_string()).collect()
    }

    fn value(&self, key: &str) -> Option<String> {
        self.iter()
            .find(|(candidate, _)| candidate.as_ref() == key)
            .and_then(|(_, value)| value.as_ref().map(|v| v.as_ref().to_string()))
    }
}

/// Serialize rows to CSV bytes.
///
/// Returns `Ok(None)` when there are no rows, so callers skip the download.
///
/// # Errors
///
/// Returns an error if the CSV writer fails.
pub fn to_csv<R: CsvRow>(rows: &[R]) -> Result<Option<Vec<u8>>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let keys = first.keys();

    let mut header = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header.write_record(&keys)?;
    let buffer = header.into_inner().map_err(|err| Error::Io(err.into_error()))?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);
    for row in rows {
        writer.write_record(keys.iter().map(|key| row.value(key).unwrap_or_default()))?;
    }

    let mut bytes = writer.into_inner().map_err(|err| Error::Io(err.into_error()))?;
    // Lines are joined, not terminated.
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(Some(bytes))
}
