//! Row model shared by static and rendered extraction.
//!
//! Static pages are parsed with `scraper`; rendered pages run
//! [`rows_script`] inside the browser. Both produce the same [`TableRow`]
//! values, so the extractors never care which mode fetched the document.

use scraper::{Html, Selector};
use serde::Deserialize;

use crate::error::AppError;

/// One `<tr>`: its CSS classes and the trimmed text of each `<td>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn new(cells: &[&str]) -> Self {
        Self {
            classes: Vec::new(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Cell text at `index`, or `""` when the row is shorter.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Parse every row matching `row_selector` out of a static HTML document.
pub fn parse_table_rows(html: &str, row_selector: &str) -> Result<Vec<TableRow>, AppError> {
    let rows = Selector::parse(row_selector)
        .map_err(|e| AppError::ParseError(format!("Invalid row selector '{row_selector}': {e}")))?;
    let cells = Selector::parse("td")
        .map_err(|e| AppError::ParseError(format!("Invalid cell selector: {e}")))?;

    let document = Html::parse_document(html);

    Ok(document
        .select(&rows)
        .map(|row| TableRow {
            classes: row.value().classes().map(str::to_string).collect(),
            cells: row
                .select(&cells)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .collect(),
        })
        .collect())
}

/// In-page script that serializes rows matching `row_selector` to a JSON
/// array of [`TableRow`] objects.
pub fn rows_script(row_selector: &str) -> Result<String, AppError> {
    let selector = serde_json::to_string(row_selector)?;
    Ok(format!(
        r#"(() => {{
  const rows = Array.from(document.querySelectorAll({selector}));
  return JSON.stringify(rows.map((row) => ({{
    classes: Array.from(row.classList),
    cells: Array.from(row.querySelectorAll("td")).map((td) => (td.textContent || "").trim()),
  }})));
}})()"#
    ))
}

/// Decode the payload returned by [`rows_script`].
pub fn decode_rows(payload: &str) -> Result<Vec<TableRow>, AppError> {
    Ok(serde_json::from_str(payload)?)
}
