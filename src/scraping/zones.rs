//! Zone page parser (`page=status_zones`).
//!
//! The zones live in the first `table.gridtable`: one row per zone with the
//! name in column 1, owning sector in column 2, input contact text in
//! column 4 and state text in column 5. Rows that are too short or carry an
//! empty name are dropped — never an error.

use scraper::{Html, Selector};

use crate::core::types::Zone;
use crate::scraping::cell_text;
use crate::scraping::mappers::{map_zone_entree, map_zone_state, zone_id};

pub fn parse_zones(html: &str) -> Vec<Zone> {
    let document = Html::parse_document(html);
    let mut zones = Vec::new();

    let (Ok(table_sel), Ok(tr_sel), Ok(td_sel)) = (
        Selector::parse("table.gridtable"),
        Selector::parse("tr"),
        Selector::parse("td"),
    ) else {
        return zones;
    };

    let Some(table) = document.select(&table_sel).next() else {
        return zones;
    };

    for row in table.select(&tr_sel) {
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        if cells.len() < 6 {
            continue;
        }
        let name = cells[0].clone();
        if name.is_empty() {
            continue;
        }
        zones.push(Zone {
            id: zone_id(&name),
            sector: cells[1].clone(),
            entree: map_zone_entree(&cells[3]),
            state: map_zone_state(&cells[4]),
            name,
        });
    }

    zones
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
    <table class="gridtable">
      <tr><th>Zone</th><th>Secteur</th><th>Type</th><th>Entrée</th><th>État</th><th></th></tr>
      <tr><td>01 Hall</td><td>1 Maison</td><td>Intrusion</td><td>Fermée</td><td>Normal</td><td></td></tr>
      <tr><td>02 Salon</td><td>1 Maison</td><td>Intrusion</td><td>Ouverte</td><td>Activée</td><td></td></tr>
      <tr><td></td><td>1 Maison</td><td>Intrusion</td><td>Fermée</td><td>Normal</td><td></td></tr>
      <tr><td>truncated row</td><td>x</td></tr>
      <tr><td>Porte Garage</td><td>2 Garage</td><td>Intrusion</td><td>???</td><td>Inconnu</td><td></td></tr>
    </table>
    </body></html>"#;

    #[test]
    fn test_parse_zones_page() {
        let zones = parse_zones(PAGE);
        assert_eq!(zones.len(), 3);

        assert_eq!(zones[0].id, "01");
        assert_eq!(zones[0].name, "01 Hall");
        assert_eq!(zones[0].sector, "1 Maison");
        assert_eq!(zones[0].entree, 1);
        assert_eq!(zones[0].state, 0);

        assert_eq!(zones[1].id, "02");
        assert_eq!(zones[1].entree, 0);
        assert_eq!(zones[1].state, 1);

        // Unmapped labels fall to the sentinel, not an error.
        assert_eq!(zones[2].id, "porte_garage");
        assert_eq!(zones[2].entree, -1);
        assert_eq!(zones[2].state, -1);
    }

    #[test]
    fn test_parse_zones_tolerates_garbage() {
        assert!(parse_zones("").is_empty());
        assert!(parse_zones("<html><body>no table here</body></html>").is_empty());
        assert!(parse_zones("<table class=\"gridtable\"></table>").is_empty());
    }
}
