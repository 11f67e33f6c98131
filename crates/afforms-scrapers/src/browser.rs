//! Production browser backend over chromiumoxide. Everything above this
//! module only sees the [`BrowserEngine`] / [`ElementHandle`] traits.

use afforms_core::{FormsError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One headless Chrome session owning a single page. Constructed at run
/// start, released through [`BrowserEngine::quit`] at run end.
pub struct ChromeEngine {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeEngine {
    /// Launches headless Chrome with a desktop viewport and a bounded page
    /// timeout. A launch failure aborts the run before any scraping.
    pub async fn launch() -> Result<Self> {
        let config = BrowserConfig::builder()
            .window_size(1920, 1080)
            .no_sandbox()
            .request_timeout(Duration::from_secs(30))
            .build()
            .map_err(FormsError::Browser)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;

        // The CDP event loop has to be polled for the session to make
        // progress; it ends when the browser goes away.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait]
impl crate::BrowserEngine for ChromeEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(FormsError::Browser(format!(
                    "timed out after {timeout:?} waiting for `{selector}`"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn crate::ElementHandle>>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;

        Ok(elements
            .into_iter()
            .map(|el| Box::new(ChromeElement(el)) as Box<dyn crate::ElementHandle>)
            .collect())
    }

    async fn quit(&mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

struct ChromeElement(Element);

#[async_trait]
impl crate::ElementHandle for ChromeElement {
    async fn text(&self) -> Result<String> {
        let text = self
            .0
            .inner_text()
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>> {
        self.0
            .attribute(name)
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))
    }

    async fn click(&self) -> Result<()> {
        self.0
            .click()
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.0
            .scroll_into_view()
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn crate::ElementHandle>>> {
        let elements = self
            .0
            .find_elements(selector)
            .await
            .map_err(|e| FormsError::Browser(e.to_string()))?;

        Ok(elements
            .into_iter()
            .map(|el| Box::new(ChromeElement(el)) as Box<dyn crate::ElementHandle>)
            .collect())
    }
}
