use colored::Colorize;
use tabled::settings::{object::Columns, Modify, Style, Width};
use tabled::{Table, Tabled};

use crate::FormRecord;

#[derive(Tabled)]
pub struct FormTableRow {
    #[tabled(rename = "Form #")]
    pub form_number: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Stored")]
    pub stored: String,
}

impl FormTableRow {
    pub fn from_record(record: &FormRecord) -> Self {
        let stored = record
            .last_updated
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            form_number: record.form_number.clone(),
            title: record.title.clone(),
            category: record.category.clone(),
            stored,
        }
    }
}

pub fn create_form_table(records: &[FormRecord]) -> String {
    let rows: Vec<FormTableRow> = records.iter().map(FormTableRow::from_record).collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(0)).with(Width::truncate(16)))
        .with(Modify::new(Columns::single(1)).with(Width::wrap(50)))
        .with(Modify::new(Columns::single(2)).with(Width::truncate(20)))
        .with(Modify::new(Columns::single(3)).with(Width::truncate(10)));

    table.to_string()
}

/// Detail view for a single form.
pub fn format_form(record: &FormRecord) -> String {
    let mut result = String::new();

    result.push_str(&format!(
        "{} - {}\n",
        record.form_number.bold(),
        record.title
    ));
    result.push_str(&format!("Category: {}\n", record.category));
    if !record.description.is_empty() {
        result.push_str(&format!("{}\n", record.description));
    }
    result.push_str(&format!("URL: {}\n", record.pdf_url));

    result
}
