//! SQLite persistence for produced summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;

use crate::error::{AppError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    summary_text TEXT NOT NULL,
    summary_text_folded TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_summaries_created_at ON summaries (created_at);
"#;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SummaryRecord {
    pub id: i64,
    pub summary_text: String,
    pub created_at: DateTime<Utc>,
}

/// Opens (creating if needed) the database behind `database_url`.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // Every connection to an in-memory database sees its own empty database,
    // so it has to stay a single connection that is never recycled.
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

#[derive(Clone)]
pub struct SummaryStore {
    pool: SqlitePool,
}

impl SummaryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the `summaries` table if it does not exist yet.
    pub async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::raw_sql(SCHEMA).execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn create(&self, summary_text: &str) -> Result<SummaryRecord> {
        if summary_text.trim().is_empty() {
            return Err(AppError::InvalidInput("Summary text must not be empty.".to_string()));
        }

        let mut conn = self.pool.acquire().await?;
        let record = sqlx::query_as::<_, SummaryRecord>(
            r#"
            INSERT INTO summaries (summary_text, summary_text_folded, created_at)
            VALUES (?, ?, ?)
            RETURNING id, summary_text, created_at
            "#,
        )
        .bind(summary_text)
        .bind(fold_case(summary_text))
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert summary: {:?}", e);
            AppError::Persistence(e)
        })?;

        Ok(record)
    }

    /// Newest first; `search` matches case-insensitively anywhere in the text.
    pub async fn list(&self, limit: u32, offset: u32, search: Option<&str>) -> Result<Vec<SummaryRecord>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(&fold_case(s))));

        let mut conn = self.pool.acquire().await?;
        let records = sqlx::query_as::<_, SummaryRecord>(
            r#"
            SELECT id, summary_text, created_at
            FROM summaries
            WHERE ?1 IS NULL OR summary_text_folded LIKE ?1 ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(pattern)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list summaries: {:?}", e);
            AppError::Persistence(e)
        })?;

        Ok(records)
    }

    /// Returns whether a record with `id` existed.
    pub async fn delete_one(&self, id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM summaries WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM summaries").execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }
}

// SQLite's LOWER() and LIKE only fold ASCII, so matching runs on a copy
// folded here with full Unicode rules.
fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
