//! Controller-status parser ("État Centrale", `page=status_controller`).
//!
//! The page is a stack of tables where single-cell rows act as section
//! headers and two-cell rows are `(label, value)` pairs under the current
//! section. Rows before any header land in a "general" section.

use scraper::{Html, Selector};

use crate::core::types::ControllerEntry;
use crate::scraping::cell_text;

const DEFAULT_SECTION: &str = "general";

pub fn parse_controller(html: &str) -> Vec<ControllerEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    let (Ok(tr_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("td, th")) else {
        return entries;
    };

    let mut section = DEFAULT_SECTION.to_string();
    for row in document.select(&tr_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        match cells.len() {
            1 => {
                if !cells[0].is_empty() {
                    section = cells[0].clone();
                }
            }
            n if n >= 2 => {
                let label = cells[0].clone();
                if label.is_empty() {
                    continue;
                }
                entries.push(ControllerEntry {
                    section: section.clone(),
                    label,
                    value: cells[1].clone(),
                });
            }
            _ => {}
        }
    }

    entries
}
