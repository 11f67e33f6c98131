pub mod migrations;

pub use migrations::apply_migrations;

use crate::{FormRecord, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the store at `db_path` and brings the
    /// schema up to date. Open failures are fatal to the caller; no retry.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        apply_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Wraps an already-connected pool. The caller is responsible for the
    /// schema; used by in-memory test setups.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts the record unless a row with the same form number already
    /// exists. An existing row is left untouched, whatever its other
    /// columns say. Returns whether a row was inserted.
    pub async fn insert_if_absent(&self, record: &mut FormRecord) -> Result<bool> {
        let existing = self.find_by_number(&record.form_number).await?;
        if let Some(existing) = existing {
            debug!(form_number = %record.form_number, "form already stored, skipping");
            record.id = existing.id;
            return Ok(false);
        }

        let now = Utc::now();
        let id = sqlx::query(
            r#"
            INSERT INTO forms (
                form_number, title, description, category, pdf_url, last_updated
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.form_number)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.category)
        .bind(record.pdf_url.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        record.id = Some(id);
        record.last_updated = Some(now);
        Ok(true)
    }

    /// Exact match on the form number, not a substring search.
    pub async fn find_by_number(&self, form_number: &str) -> Result<Option<FormRecord>> {
        let record = sqlx::query_as::<_, FormRecord>("SELECT * FROM forms WHERE form_number = ?")
            .bind(form_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Case-insensitive substring match over title, description and form
    /// number, in insertion order.
    pub async fn search(&self, keyword: &str) -> Result<Vec<FormRecord>> {
        let pattern = format!("%{}%", keyword);
        let records = sqlx::query_as::<_, FormRecord>(
            r#"
            SELECT * FROM forms
            WHERE title LIKE ?
               OR description LIKE ?
               OR form_number LIKE ?
            ORDER BY id
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_forms(&self) -> Result<Vec<FormRecord>> {
        let records = sqlx::query_as::<_, FormRecord>("SELECT * FROM forms ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    async fn test_connection() -> Database {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        apply_migrations(&pool).await.unwrap();
        Database { pool }
    }

    fn record(number: &str, title: &str) -> FormRecord {
        FormRecord {
            id: None,
            form_number: number.to_string(),
            title: title.to_string(),
            description: "Last Updated: 2024-01-01".to_string(),
            category: "Air Force Forms".to_string(),
            pdf_url: Url::parse("https://example.com/form.pdf").unwrap(),
            last_updated: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = test_connection().await;

        let mut form = record("AF 910", "Enlisted Evaluation");
        assert!(db.insert_if_absent(&mut form).await.unwrap());
        assert!(form.id.is_some());
        assert!(form.last_updated.is_some());

        let found = db.find_by_number("AF 910").await.unwrap().unwrap();
        assert_eq!(found.title, "Enlisted Evaluation");
        assert!(found.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first_row() {
        let db = test_connection().await;

        let mut first = record("AF 910", "Original Title");
        assert!(db.insert_if_absent(&mut first).await.unwrap());

        let mut second = record("AF 910", "Replacement Title");
        assert!(!db.insert_if_absent(&mut second).await.unwrap());
        assert_eq!(second.id, first.id);

        let stored = db.find_by_number("AF 910").await.unwrap().unwrap();
        assert_eq!(stored.title, "Original Title");

        let all = db.list_forms().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_number_is_exact() {
        let db = test_connection().await;

        let mut form = record("AF 910-1", "Evaluation Shell");
        db.insert_if_absent(&mut form).await.unwrap();

        // "AF910" is a substring-style near miss, not an exact key.
        assert!(db.find_by_number("AF910").await.unwrap().is_none());
        assert!(db.find_by_number("AF 910").await.unwrap().is_none());
        assert!(db.find_by_number("AF 910-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_matches_all_three_columns() {
        let db = test_connection().await;

        let mut by_title = record("AF 910", "Officer EVALUATION Report");
        let mut by_description = record("DD 214", "Discharge Papers");
        by_description.description = "evaluation archive copy".to_string();
        let mut by_number = record("SF EVAL-1", "Standard Form");
        let mut unrelated = record("AF 1206", "Nomination for Award");

        db.insert_if_absent(&mut by_title).await.unwrap();
        db.insert_if_absent(&mut by_description).await.unwrap();
        db.insert_if_absent(&mut by_number).await.unwrap();
        db.insert_if_absent(&mut unrelated).await.unwrap();

        let results = db.search("evaluation").await.unwrap();
        let numbers: Vec<_> = results.iter().map(|r| r.form_number.as_str()).collect();
        assert_eq!(numbers, vec!["AF 910", "DD 214"]);

        // Substring of the form number column, case-insensitive.
        let results = db.search("eval").await.unwrap();
        assert_eq!(results.len(), 3);

        assert!(db.search("no-such-keyword").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_propagates() {
        // The parent exists but is not a directory; the open must fail
        // before any other resource is acquired, not be papered over.
        let result = Database::new("/dev/null/forms.db").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = test_connection().await;
        apply_migrations(db.pool()).await.unwrap();

        let mut form = record("AFTO 95-1", "Maintenance Record");
        assert!(db.insert_if_absent(&mut form).await.unwrap());
    }
}
