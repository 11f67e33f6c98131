//! An in-memory [`BrowserEngine`] that replays scripted listing pages.
//! Backs the walker and orchestrator tests, where the live index site
//! would otherwise be the only fixture.

use afforms_core::{FormsError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::walker::{CELL_SELECTOR, DOC_LINK_SELECTOR, PAGINATION_SELECTOR, ROW_SELECTOR, TABLE_SELECTOR};
use crate::{BrowserEngine, ElementHandle};

#[derive(Debug, Clone)]
pub struct ScriptedRow {
    pub cells: Vec<String>,
    pub href: Option<String>,
}

impl ScriptedRow {
    pub fn new(cells: &[&str], href: Option<&str>) -> Self {
        Self {
            cells: cells.iter().map(|c| c.to_string()).collect(),
            href: href.map(|h| h.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub rows: Vec<ScriptedRow>,
}

pub struct ScriptedEngine {
    pages: Vec<ScriptedPage>,
    current: Arc<Mutex<usize>>,
    fail_load: bool,
    /// Pagination controls exist only for target pages up to this 1-based
    /// number; `None` means all pages are reachable.
    last_reachable_page: Option<usize>,
    quits: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages,
            current: Arc::new(Mutex::new(0)),
            fail_load: false,
            last_reachable_page: None,
            quits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The marker element never appears for any URL.
    pub fn with_failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Simulates a broken pagination bar: no control exists for pages past
    /// `page` (1-based).
    pub fn with_broken_pagination_after(mut self, page: usize) -> Self {
        self.last_reachable_page = Some(page);
        self
    }

    /// Shared counter of `quit` calls, for asserting the release discipline.
    pub fn quit_probe(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.quits)
    }
}

#[async_trait]
impl BrowserEngine for ScriptedEngine {
    async fn navigate(&self, _url: &str) -> Result<()> {
        *self.current.lock().expect("lock poisoned") = 0;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if selector == TABLE_SELECTOR && !self.fail_load && !self.pages.is_empty() {
            return Ok(());
        }
        Err(FormsError::Browser(format!(
            "timed out after {timeout:?} waiting for `{selector}`"
        )))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let current = *self.current.lock().expect("lock poisoned");

        if selector == ROW_SELECTOR {
            let page = self
                .pages
                .get(current)
                .ok_or_else(|| FormsError::Browser("no page loaded".to_string()))?;
            return Ok(page
                .rows
                .iter()
                .cloned()
                .map(|row| Box::new(ScriptedElement::Row(row)) as Box<dyn ElementHandle>)
                .collect());
        }

        if selector == PAGINATION_SELECTOR {
            let reachable = self.last_reachable_page.unwrap_or(self.pages.len());
            let controls = (0..self.pages.len())
                .filter(|target| target + 1 <= reachable)
                .map(|target| {
                    Box::new(ScriptedElement::Control {
                        label: (target + 1).to_string(),
                        target,
                        current: Arc::clone(&self.current),
                    }) as Box<dyn ElementHandle>
                })
                .collect();
            return Ok(controls);
        }

        Ok(Vec::new())
    }

    async fn quit(&mut self) -> Result<()> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

enum ScriptedElement {
    Row(ScriptedRow),
    Link { href: String },
    Cell { text: String },
    Control {
        label: String,
        target: usize,
        current: Arc<Mutex<usize>>,
    },
}

#[async_trait]
impl ElementHandle for ScriptedElement {
    async fn text(&self) -> Result<String> {
        match self {
            ScriptedElement::Row(row) => Ok(row.cells.join(" ")),
            ScriptedElement::Link { .. } => Ok(String::new()),
            ScriptedElement::Cell { text } => Ok(text.trim().to_string()),
            ScriptedElement::Control { label, .. } => Ok(label.clone()),
        }
    }

    async fn attr(&self, name: &str) -> Result<Option<String>> {
        match self {
            ScriptedElement::Link { href } if name == "href" => Ok(Some(href.clone())),
            _ => Ok(None),
        }
    }

    async fn click(&self) -> Result<()> {
        match self {
            ScriptedElement::Control { target, current, .. } => {
                *current.lock().expect("lock poisoned") = *target;
                Ok(())
            }
            _ => Err(FormsError::Scrape("element is not clickable".to_string())),
        }
    }

    async fn scroll_into_view(&self) -> Result<()> {
        Ok(())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let ScriptedElement::Row(row) = self else {
            return Ok(Vec::new());
        };

        if selector == DOC_LINK_SELECTOR {
            return Ok(row
                .href
                .iter()
                .map(|href| {
                    Box::new(ScriptedElement::Link { href: href.clone() })
                        as Box<dyn ElementHandle>
                })
                .collect());
        }

        if selector == CELL_SELECTOR {
            return Ok(row
                .cells
                .iter()
                .map(|text| {
                    Box::new(ScriptedElement::Cell { text: text.clone() })
                        as Box<dyn ElementHandle>
                })
                .collect());
        }

        Ok(Vec::new())
    }
}
