//! Drives the browser engine through one paginated, client-rendered
//! listing. The walker never owns the engine; it borrows it for the run.

use afforms_core::{FormsError, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{BrowserEngine, ElementHandle};

/// Marker element whose presence means the listing has rendered.
pub const TABLE_SELECTOR: &str = "table";
/// Table rows.
pub const ROW_SELECTOR: &str = "tr";
/// Cells within a row.
pub const CELL_SELECTOR: &str = "td";
/// Links that point at a downloadable document.
pub const DOC_LINK_SELECTOR: &str = "a[href*='.pdf'], a[href*='/publication/']";
/// Pagination controls; the target page is picked by label text.
pub const PAGINATION_SELECTOR: &str = "a.paginate_button";

/// Raw cell text and link target of one listing row, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<String>,
    pub href: String,
}

pub struct PageWalker<'a> {
    engine: &'a dyn BrowserEngine,
    load_timeout: Duration,
    settle_delay: Duration,
    click_delay: Duration,
}

impl<'a> PageWalker<'a> {
    pub fn new(
        engine: &'a dyn BrowserEngine,
        load_timeout: Duration,
        settle_delay: Duration,
        click_delay: Duration,
    ) -> Self {
        Self {
            engine,
            load_timeout,
            settle_delay,
            click_delay,
        }
    }

    /// Navigates to the listing and blocks until the table marker appears,
    /// then sleeps a fixed grace period so client-side rendering settles.
    /// A missing marker within the timeout is an error: no rows for this
    /// URL.
    pub async fn load(&self, url: &str) -> Result<()> {
        info!(url, "loading listing page");
        self.engine.navigate(url).await?;
        self.engine
            .wait_for_selector(TABLE_SELECTOR, self.load_timeout)
            .await?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    /// Emits one raw row per document link found in a table row with at
    /// least 3 cells. Header rows have fewer cells and are skipped, as is
    /// any row that fails mid-read.
    pub async fn rows_on_current_page(&self) -> Result<Vec<RawRow>> {
        let rows = self.engine.find_elements(ROW_SELECTOR).await?;
        debug!(count = rows.len(), "found table rows");

        let mut raw_rows = Vec::new();
        for row in &rows {
            match self.read_row(row.as_ref()).await {
                Ok(mut emitted) => raw_rows.append(&mut emitted),
                Err(e) => {
                    warn!(error = %e, "error reading row, skipping");
                }
            }
        }
        Ok(raw_rows)
    }

    async fn read_row(&self, row: &dyn ElementHandle) -> Result<Vec<RawRow>> {
        let links = row.find_elements(DOC_LINK_SELECTOR).await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let cells = row.find_elements(CELL_SELECTOR).await?;
        if cells.len() < 3 {
            return Ok(Vec::new());
        }

        let mut cell_texts = Vec::with_capacity(cells.len());
        for cell in &cells {
            cell_texts.push(cell.text().await?);
        }

        let mut emitted = Vec::new();
        for link in &links {
            let Some(href) = link.attr("href").await? else {
                continue;
            };
            emitted.push(RawRow {
                cells: cell_texts.clone(),
                href,
            });
        }
        Ok(emitted)
    }

    /// Clicks the pagination control labeled with the 1-based `next_page`
    /// number. Returns `false` (after logging) when the control cannot be
    /// found or clicked; that is the walker's natural terminal condition,
    /// not an error.
    pub async fn advance_page(&self, next_page: u32) -> bool {
        match self.try_advance(next_page).await {
            Ok(()) => true,
            Err(e) => {
                info!(next_page, error = %e, "no next page, stopping pagination");
                false
            }
        }
    }

    async fn try_advance(&self, next_page: u32) -> Result<()> {
        let label = next_page.to_string();
        let controls = self.engine.find_elements(PAGINATION_SELECTOR).await?;

        for control in &controls {
            if control.text().await? == label {
                control.scroll_into_view().await?;
                tokio::time::sleep(self.click_delay).await;
                control.click().await?;
                tokio::time::sleep(self.settle_delay).await;
                return Ok(());
            }
        }

        Err(FormsError::Scrape(format!(
            "pagination control for page {label} not found"
        )))
    }
}
