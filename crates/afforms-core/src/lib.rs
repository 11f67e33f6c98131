use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row};
use std::str::FromStr;
use url::Url;

mod db;
mod display;
mod query;

pub use db::{apply_migrations, Database};
pub use display::{create_form_table, format_form, FormTableRow};
pub use query::FormsQuery;

pub type Result<T> = std::result::Result<T, FormsError>;

#[derive(Debug, thiserror::Error)]
pub enum FormsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Scraping error: {0}")]
    Scrape(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// One scraped form listing, keyed by its form number.
///
/// `last_updated` is assigned by the store at insert time; it stays `None`
/// on records that have not been persisted yet. The listing's own
/// "last updated" column is carried in `description`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: Option<i64>,
    pub form_number: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub pdf_url: Url,
    pub last_updated: Option<DateTime<Utc>>,
}

// Manual FromRow so pdf_url round-trips through its TEXT column.
impl<'r> FromRow<'r, sqlx::sqlite::SqliteRow> for FormRecord {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let url_str: String = row.try_get("pdf_url")?;
        let pdf_url = Url::from_str(&url_str).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(FormRecord {
            id: row.try_get("id")?,
            form_number: row.try_get("form_number")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            pdf_url,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_record_serialization() {
        let record = FormRecord {
            id: Some(1),
            form_number: "AF 910-1".to_string(),
            title: "Enlisted Performance Report".to_string(),
            description: "Last Updated: 2024-01-15".to_string(),
            category: "Air Force Forms".to_string(),
            pdf_url: Url::from_str("https://static.e-publishing.af.mil/af910.pdf").unwrap(),
            last_updated: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        let deserialized: FormRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record.id, deserialized.id);
        assert_eq!(record.form_number, deserialized.form_number);
        assert_eq!(record.pdf_url.as_str(), deserialized.pdf_url.as_str());
    }

    #[test]
    fn test_error_display() {
        let db_error = FormsError::Database(sqlx::Error::RowNotFound);
        assert!(db_error.to_string().contains("Database error"));

        let browser_error = FormsError::Browser("session crashed".to_string());
        assert!(browser_error.to_string().contains("session crashed"));

        let scrape_error = FormsError::Scrape("row missing cells".to_string());
        assert!(scrape_error.to_string().contains("row missing cells"));
    }
}
