//! Orchestrates a full scrape of the e-publishing product index: walk each
//! configured listing, normalise its rows, insert what is new.

use afforms_core::{Database, FormRecord, Result};
use tracing::{error, info, warn};

use crate::extract::{normalize_category, record_from_row};
use crate::walker::PageWalker;
use crate::{BrowserEngine, ScrapeConfig};

pub struct EPubsScraper {
    engine: Box<dyn BrowserEngine>,
    config: ScrapeConfig,
}

impl EPubsScraper {
    pub fn new(engine: Box<dyn BrowserEngine>) -> Self {
        Self::with_config(engine, ScrapeConfig::default())
    }

    pub fn with_config(engine: Box<dyn BrowserEngine>, config: ScrapeConfig) -> Self {
        Self { engine, config }
    }

    /// Runs the whole pipeline over `urls`, then releases the browser
    /// session exactly once, whatever happened in between. Navigation
    /// failures are local to their URL; storage failures abort the run.
    pub async fn run(mut self, db: &Database, urls: &[String]) -> Result<()> {
        let outcome = self.scrape_all(db, urls).await;
        if let Err(e) = self.engine.quit().await {
            warn!(error = %e, "failed to release browser session");
        }
        outcome
    }

    async fn scrape_all(&self, db: &Database, urls: &[String]) -> Result<()> {
        for url in urls {
            info!(url, "scraping listing");
            match self.scrape_listing(url).await {
                Ok(records) => {
                    info!(url, count = records.len(), "collected forms");
                    self.store_records(db, records).await?;
                }
                Err(e) => {
                    // Partial results from this URL were already lost at
                    // load time; later URLs still run.
                    error!(url, error = %e, "listing failed, moving on");
                }
            }
        }
        Ok(())
    }

    /// Walks one listing from page 1 until no next-page control is
    /// available (or the configured cap is hit) and returns the normalised
    /// records from every page visited.
    pub async fn scrape_listing(&self, url: &str) -> Result<Vec<FormRecord>> {
        let walker = PageWalker::new(
            self.engine.as_ref(),
            self.config.load_timeout,
            self.config.settle_delay,
            self.config.click_delay,
        );
        walker.load(url).await?;

        let category = normalize_category(self.config.category.as_deref());
        let cap_hit = |p: u32| self.config.max_pages.is_some_and(|cap| p > cap);
        let mut records = Vec::new();
        let mut page: u32 = 1;

        while !cap_hit(page) {
            // A page that fails mid-read ends pagination for this URL but
            // keeps what earlier pages already yielded.
            let raw_rows = match walker.rows_on_current_page().await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(page, error = %e, "could not read page, stopping pagination");
                    break;
                }
            };
            let before = records.len();
            for raw in &raw_rows {
                if let Some(record) = record_from_row(raw, &category) {
                    records.push(record);
                } else {
                    warn!(?raw, "row did not normalise, skipping");
                }
            }
            info!(page, kept = records.len() - before, raw = raw_rows.len(), "processed page");

            // Do not click towards a page the cap forbids reading.
            if cap_hit(page + 1) {
                info!(page, "page cap reached");
                break;
            }
            if !walker.advance_page(page + 1).await {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    async fn store_records(&self, db: &Database, records: Vec<FormRecord>) -> Result<()> {
        let mut inserted = 0usize;
        let mut skipped = 0usize;
        for mut record in records {
            if db.insert_if_absent(&mut record).await? {
                inserted += 1;
            } else {
                skipped += 1;
            }
        }
        info!(inserted, skipped, "stored records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedEngine, ScriptedPage, ScriptedRow};
    use afforms_core::apply_migrations;
    use sqlx::sqlite::SqlitePool;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    async fn test_db() -> Database {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        apply_migrations(&pool).await.unwrap();
        Database::from_pool(pool)
    }

    fn fast_config() -> ScrapeConfig {
        ScrapeConfig {
            load_timeout: Duration::from_millis(50),
            settle_delay: Duration::ZERO,
            click_delay: Duration::ZERO,
            ..ScrapeConfig::default()
        }
    }

    fn two_page_listing() -> Vec<ScriptedPage> {
        vec![
            ScriptedPage {
                rows: vec![
                    ScriptedRow::new(
                        &["AF 910", "Eval Form", "2024-01-01"],
                        Some("https://static.example.com/910.pdf"),
                    ),
                    ScriptedRow::new(&["bad-row-no-link", "x", "y"], None),
                ],
            },
            ScriptedPage {
                rows: vec![ScriptedRow::new(
                    &["AF 920", "Other Form", "2024-02-01"],
                    Some("https://static.example.com/920.pdf"),
                )],
            },
        ]
    }

    #[tokio::test]
    async fn test_two_page_listing_end_to_end() {
        let db = test_db().await;
        let engine = ScriptedEngine::new(two_page_listing());
        let quits = engine.quit_probe();
        let scraper = EPubsScraper::with_config(Box::new(engine), fast_config());

        scraper
            .run(&db, &["https://example.com/index".to_string()])
            .await
            .unwrap();

        let all = db.list_forms().await.unwrap();
        let numbers: Vec<_> = all.iter().map(|r| r.form_number.as_str()).collect();
        assert_eq!(numbers, vec!["AF 910", "AF 920"]);

        let hits = db.search("Eval").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].form_number, "AF 910");

        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pagination_failure_keeps_page_one() {
        let db = test_db().await;
        let engine = ScriptedEngine::new(two_page_listing()).with_broken_pagination_after(1);
        let scraper = EPubsScraper::with_config(Box::new(engine), fast_config());

        scraper
            .run(&db, &["https://example.com/index".to_string()])
            .await
            .unwrap();

        let all = db.list_forms().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].form_number, "AF 910");
    }

    #[tokio::test]
    async fn test_load_failure_still_releases_session() {
        let db = test_db().await;
        let engine = ScriptedEngine::new(two_page_listing()).with_failing_load();
        let quits = engine.quit_probe();
        let scraper = EPubsScraper::with_config(Box::new(engine), fast_config());

        // A dead listing is logged and skipped; the run itself succeeds.
        scraper
            .run(&db, &["https://example.com/index".to_string()])
            .await
            .unwrap();

        assert!(db.list_forms().await.unwrap().is_empty());
        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_max_pages_cap() {
        let db = test_db().await;
        let engine = ScriptedEngine::new(two_page_listing());
        let config = ScrapeConfig {
            max_pages: Some(1),
            ..fast_config()
        };
        let scraper = EPubsScraper::with_config(Box::new(engine), config);

        scraper
            .run(&db, &["https://example.com/index".to_string()])
            .await
            .unwrap();

        let all = db.list_forms().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].form_number, "AF 910");
    }

    #[tokio::test]
    async fn test_zero_page_cap_scrapes_nothing() {
        let db = test_db().await;
        let engine = ScriptedEngine::new(two_page_listing());
        let quits = engine.quit_probe();
        let config = ScrapeConfig {
            max_pages: Some(0),
            ..fast_config()
        };
        let scraper = EPubsScraper::with_config(Box::new(engine), config);

        scraper
            .run(&db, &["https://example.com/index".to_string()])
            .await
            .unwrap();

        assert!(db.list_forms().await.unwrap().is_empty());
        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let db = test_db().await;

        for _ in 0..2 {
            let engine = ScriptedEngine::new(two_page_listing());
            let scraper = EPubsScraper::with_config(Box::new(engine), fast_config());
            scraper
                .run(&db, &["https://example.com/index".to_string()])
                .await
                .unwrap();
        }

        assert_eq!(db.list_forms().await.unwrap().len(), 2);
    }
}
