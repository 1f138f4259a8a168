//! Sector parser (`page=spc_home`).
//!
//! The home page interleaves sector rows with everything else, so every row
//! of the document is scanned: a row qualifies when its second cell reads
//! `Secteur <n> : <name>`; the third cell is the state label. The panel's
//! synthetic "Tous Secteurs" summary row is emitted under the reserved
//! id `0`.

use regex::Regex;
use scraper::{Html, Selector};

use crate::core::types::Sector;
use crate::scraping::cell_text;
use crate::scraping::mappers::map_sector_state;

pub fn parse_sectors(html: &str) -> Vec<Sector> {
    let document = Html::parse_document(html);
    let mut sectors = Vec::new();

    let (Ok(tr_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("td, th")) else {
        return sectors;
    };
    let Ok(sector_re) = Regex::new(r"(?i)^Secteur\s+(\d+)\s*:\s*(.+)$") else {
        return sectors;
    };

    let mut seen_global = false;
    for row in document.select(&tr_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        if cells.len() < 3 {
            continue;
        }
        let label = cells[1].trim();

        if let Some(caps) = sector_re.captures(label) {
            let Ok(id) = caps[1].parse::<u32>() else {
                continue;
            };
            sectors.push(Sector {
                id,
                name: caps[2].trim().to_string(),
                state: map_sector_state(&cells[2]),
            });
        } else if label.to_lowercase().starts_with("tous secteurs") && !seen_global {
            seen_global = true;
            sectors.push(Sector {
                id: 0,
                name: "Tous Secteurs".to_string(),
                state: map_sector_state(&cells[2]),
            });
        }
    }

    sectors
}
