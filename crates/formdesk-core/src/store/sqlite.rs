//! `SQLite` backed submission store.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use super::SubmissionStore;
use crate::query::{SortDirection, SortField, SortValue, SubmissionQuery};
use crate::submission::{Submission, SubmissionId, Timestamp};
use crate::{Error, Result};

/// Submission store on a local or shared `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the store at the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS submissions (
                id TEXT PRIMARY KEY,
                name TEXT,
                email TEXT,
                message TEXT,
                created_at INTEGER,
                submitted_at INTEGER,
                read INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // One index per sortable field, each ending in the id tie-breaker
        for field in SortField::ALL {
            let column = column(field);
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_submissions_{column} ON submissions({column}, id)"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Insert or replace a submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert(&self, submission: &Submission) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO submissions (
                id, name, email, message, created_at, submitted_at, read
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(submission.id.as_str())
        .bind(submission.name.as_deref())
        .bind(submission.email.as_deref())
        .bind(submission.message.as_deref())
        .bind(submission.created_at.map(Timestamp::as_millis))
        .bind(submission.timestamp.map(Timestamp::as_millis))
        .bind(submission.read)
        .execute(&self.pool)
        .await?;

        debug!("Stored submission {}", submission.id);
        Ok(())
    }

    /// Get a submission by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &SubmissionId) -> Result<Option<Submission>> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, message, created_at, submitted_at, read
            FROM submissions
            WHERE id = ?
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_submission).transpose()
    }

    /// Total number of stored submissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    async fn fetch(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        let column = column(query.order_by);
        let (after, direction) = match query.direction {
            SortDirection::Ascending => (">", "ASC"),
            SortDirection::Descending => ("<", "DESC"),
        };

        let mut sql = format!(
            "SELECT id, name, email, message, created_at, submitted_at, read \
             FROM submissions WHERE {column} IS NOT NULL"
        );
        if query.created_since.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if query.start_after.is_some() {
            sql.push_str(&format!(
                " AND ({column} {after} ? OR ({column} = ? AND id {after} ?))"
            ));
        }
        sql.push_str(&format!(
            " ORDER BY {column} {direction}, id {direction} LIMIT ?"
        ));

        let mut statement = sqlx::query(&sql);
        if let Some(since) = query.created_since {
            statement = statement.bind(since.as_millis());
        }
        if let Some(cursor) = &query.start_after {
            statement = match &cursor.value {
                SortValue::Time(time) => statement.bind(time.as_millis()).bind(time.as_millis()),
                SortValue::Text(text) => statement.bind(text.clone()).bind(text.clone()),
            };
            statement = statement.bind(cursor.id.as_str().to_owned());
        }
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let rows = statement.bind(limit).fetch_all(&self.pool).await?;

        debug!(
            "Fetched {} submissions ordered by {} {}",
            rows.len(),
            query.order_by.as_str(),
            query.direction.as_str()
        );

        rows.iter().map(row_to_submission).collect()
    }

    async fn set_read(&self, id: &SubmissionId, read: bool) -> Result<()> {
        let result = sqlx::query("UPDATE submissions SET read = ? WHERE id = ?")
            .bind(read)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        debug!("Marked submission {id} read={read}");
        Ok(())
    }

    async fn delete(&self, id: &SubmissionId) -> Result<()> {
        sqlx::query("DELETE FROM submissions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        debug!("Deleted submission {id}");
        Ok(())
    }
}

const fn column(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::Timestamp => "submitted_at",
        SortField::Name => "name",
        SortField::Email => "email",
    }
}

/// Convert a database row to a Submission.
fn row_to_submission(row: &SqliteRow) -> Result<Submission> {
    Ok(Submission {
        id: SubmissionId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        message: row.try_get("message")?,
        created_at: row
            .try_get::<Option<i64>, _>("created_at")?
            .map(Timestamp::from_millis),
        timestamp: row
            .try_get::<Option<i64>, _>("submitted_at")?
            .map(Timestamp::from_millis),
        read: row.try_get("read")?,
    })
}
