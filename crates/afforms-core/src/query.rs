use crate::{Database, FormRecord, Result};

/// Read-only lookup layer over a populated store. No caching, no mutation;
/// safe to run as a separate process after a scrape has finished.
pub struct FormsQuery {
    db: Database,
}

impl FormsQuery {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Keyword search over title, description and form number.
    pub async fn search(&self, keyword: &str) -> Result<Vec<FormRecord>> {
        self.db.search(keyword).await
    }

    /// Exact form-number lookup.
    pub async fn get_by_number(&self, form_number: &str) -> Result<Option<FormRecord>> {
        self.db.find_by_number(form_number).await
    }
}
