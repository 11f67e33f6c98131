pub mod browser;
pub mod epubs;
pub mod extract;
pub mod scripted;
pub mod walker;

use afforms_core::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use browser::ChromeEngine;
pub use epubs::EPubsScraper;
pub use scripted::{ScriptedEngine, ScriptedPage, ScriptedRow};
pub use walker::{PageWalker, RawRow};

/// Category assigned to rows scraped from the product-index table.
pub const DEFAULT_CATEGORY: &str = "Air Force Forms";

/// The three product-index views the tool was built for.
pub const DEFAULT_LISTING_URLS: &[&str] = &[
    "https://www.e-publishing.af.mil/Product-Index/#/?view=pubs&orgID=10141&catID=1&series=-1&modID=449&tabID=131",
    "https://www.e-publishing.af.mil/Product-Index/#/?view=form&orgID=10141&catID=8&low=-1&high=-1&modID=449&tabID=131",
    "https://www.e-publishing.af.mil/Product-Index/#/?view=cat&catID=14",
];

/// A handle to one DOM element inside the automation engine.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Visible text content, trimmed.
    async fn text(&self) -> Result<String>;

    async fn attr(&self, name: &str) -> Result<Option<String>>;

    async fn click(&self) -> Result<()>;

    async fn scroll_into_view(&self) -> Result<()>;

    /// Matching descendants of this element.
    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>>;
}

/// The capabilities the pipeline needs from a browser automation engine.
/// The page walker only talks to this trait; the production backend is
/// [`ChromeEngine`], tests use [`ScriptedEngine`].
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Blocks until `selector` matches something, or errors once `timeout`
    /// has elapsed.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>>;

    /// Releases the underlying session. Called exactly once, on every exit
    /// path of a run.
    async fn quit(&mut self) -> Result<()>;
}

/// Timing and bounds for a scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// How long to wait for the listing table to appear after navigation.
    pub load_timeout: Duration,
    /// Grace period for client-side rendering after load and after each
    /// pagination click.
    pub settle_delay: Duration,
    /// Pause between scrolling a pagination control into view and clicking.
    pub click_delay: Duration,
    /// Optional cap on pages walked per listing URL. Pagination otherwise
    /// ends when no next-page control is available.
    pub max_pages: Option<u32>,
    /// Section heading for scraped rows; `None` maps to "Uncategorized".
    pub category: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            click_delay: Duration::from_secs(1),
            max_pages: None,
            category: Some(DEFAULT_CATEGORY.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScrapeConfig::default();
        assert_eq!(config.load_timeout, Duration::from_secs(30));
        assert_eq!(config.max_pages, None);
        assert_eq!(config.category.as_deref(), Some(DEFAULT_CATEGORY));
    }
}
