//! Output page parser (`page=status_outputs`).
//!
//! One row per output: name and raw state label. The raw label is kept
//! verbatim — it is published as `state_txt` next to the mapped state.

use scraper::{Html, Selector};

use crate::core::types::Output;
use crate::scraping::cell_text;
use crate::scraping::mappers::{map_output_state, zone_id};

pub fn parse_outputs(html: &str) -> Vec<Output> {
    let document = Html::parse_document(html);
    let mut outputs = Vec::new();

    let (Ok(tr_sel), Ok(td_sel)) = (Selector::parse("tr"), Selector::parse("td")) else {
        return outputs;
    };

    for row in document.select(&tr_sel) {
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        if cells.len() < 2 {
            continue;
        }
        let name = cells[0].clone();
        if name.is_empty() {
            continue;
        }
        let state_txt = cells[1].clone();
        outputs.push(Output {
            id: zone_id(&name),
            state: map_output_state(&state_txt),
            name,
            state_txt,
        });
    }

    outputs
}
