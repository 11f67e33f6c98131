//! Pure text normalisation for scraped rows. No I/O lives here; absence of
//! a match is an expected outcome, not an error.

use afforms_core::FormRecord;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::RawRow;

/// Form-number patterns in priority order. More specific prefixes come
/// before the generic "AF FORM n" shape; the first match wins.
const FORM_NUMBER_PATTERNS: &[&str] = &[
    r"(?i)(AF\s*\d+-\d+)",
    r"(?i)(AFTO\s*\d+-\d+)",
    r"(?i)(DD\s*\d+-\d+)",
    r"(?i)(SF\s*\d+-\d+)",
    r"(?i)(IMT\s*\d+-\d+)",
    r"(?i)(AF\s*FORM\s*\d+)",
];

fn patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        FORM_NUMBER_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("pattern table is valid"))
            .collect()
    })
}

/// Extracts a form number from free text via the pattern cascade. Returns
/// an empty string when nothing matches.
pub fn extract_form_number(text: &str) -> String {
    for pattern in patterns() {
        if let Some(found) = pattern.find(text) {
            return found.as_str().trim().to_string();
        }
    }
    String::new()
}

/// Normalises the raw first-column text into a form number: the cascade
/// result when it matches, otherwise the trimmed cell itself (the index
/// table's first column already is the number).
pub fn normalize_form_number(raw: &str) -> String {
    let extracted = extract_form_number(raw);
    if extracted.is_empty() {
        raw.trim().to_string()
    } else {
        extracted
    }
}

/// Trimmed heading text, or the sentinel when no heading is resolvable.
pub fn normalize_category(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(heading) if !heading.is_empty() => heading.to_string(),
        _ => "Uncategorized".to_string(),
    }
}

/// Turns one raw listing row into a record. `None` when the row yields no
/// form number or its link target does not parse; such rows are dropped
/// before storage.
pub fn record_from_row(row: &RawRow, category: &str) -> Option<FormRecord> {
    let cells = &row.cells;
    if cells.len() < 3 {
        return None;
    }

    let form_number = normalize_form_number(&cells[0]);
    if form_number.is_empty() {
        return None;
    }

    let pdf_url = Url::parse(&row.href).ok()?;

    Some(FormRecord {
        id: None,
        form_number,
        title: cells[1].trim().to_string(),
        description: format!("Last Updated: {}", cells[2].trim()),
        category: category.to_string(),
        pdf_url,
        last_updated: None,
    })
}
