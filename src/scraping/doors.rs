//! Door page parser (`page=status_doors`).
//!
//! One row per door: numeric door id, name, backing zone, sector, door
//! state, lock-button (drs) state and contact (dps) state. A row qualifies
//! when its first cell is a bare number — that skips headers and the
//! page chrome in one test.

use scraper::{Html, Selector};

use crate::core::types::Door;
use crate::scraping::cell_text;
use crate::scraping::mappers::{map_door_dps, map_door_drs, map_door_state};

pub fn parse_doors(html: &str) -> Vec<Door> {
    let document = Html::parse_document(html);
    let mut doors = Vec::new();

    let (Ok(tr_sel), Ok(td_sel)) = (Selector::parse("tr"), Selector::parse("td")) else {
        return doors;
    };

    for row in document.select(&tr_sel) {
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        if cells.len() < 7 {
            continue;
        }
        let id = cells[0].trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let name = cells[1].clone();
        if name.is_empty() {
            continue;
        }
        doors.push(Door {
            id: id.to_string(),
            name,
            zone: cells[2].clone(),
            sector: cells[3].clone(),
            state: map_door_state(&cells[4]),
            drs: map_door_drs(&cells[5]),
            dps: map_door_dps(&cells[6]),
        });
    }

    doors
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
    <table class="gridtable">
      <tr><th>#</th><th>Porte</th><th>Zone</th><th>Secteur</th><th>État</th><th>DRS</th><th>DPS</th></tr>
      <tr><td>1</td><td>Entrée principale</td><td>9</td><td>1</td><td>Verrouillée</td><td>Verrouillé</td><td>Fermé</td></tr>
      <tr><td>2</td><td>Quai</td><td>10</td><td>2</td><td>Déverrouillée</td><td>Déverrouillé</td><td>Ouvert</td></tr>
      <tr><td>3</td><td>Local technique</td><td>11</td><td>2</td><td>Alarme</td><td>Normal</td><td>Sabotage</td></tr>
      <tr><td>x</td><td>not a door row</td><td>-</td><td>-</td><td>-</td><td>-</td><td>-</td></tr>
    </table>
    </body></html>"#;

    #[test]
    fn test_parse_doors_page() {
        let doors = parse_doors(PAGE);
        assert_eq!(doors.len(), 3);

        assert_eq!(doors[0].id, "1");
        assert_eq!(doors[0].name, "Entrée principale");
        assert_eq!(doors[0].zone, "9");
        assert_eq!(doors[0].sector, "1");
        assert_eq!(doors[0].state, 0);
        assert_eq!(doors[0].drs, 0);
        assert_eq!(doors[0].dps, 0);

        assert_eq!(doors[1].state, 1);
        assert_eq!(doors[1].drs, 1);
        assert_eq!(doors[1].dps, 1);

        assert_eq!(doors[2].state, 4);
        assert_eq!(doors[2].drs, 0);
        assert_eq!(doors[2].dps, 4);
    }

    #[test]
    fn test_parse_doors_empty() {
        assert!(parse_doors("").is_empty());
        assert!(parse_doors("<table><tr><td>1</td></tr></table>").is_empty());
    }
}
