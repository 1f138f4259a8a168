//! End-to-end scenarios at the parse → diff → topic level.
//!
//! These drive the same pure pipeline the scan loops use — page HTML in,
//! (topic, value) publications out — so the observable broker behavior is
//! pinned without a live panel or broker.

use spc_bridge::mqtt::topics;
use spc_bridge::panel::actions::PanelAction;
use spc_bridge::scraping::sectors::parse_sectors;
use spc_bridge::scraping::zones::parse_zones;
use spc_bridge::types::CommandCategory;
use spc_bridge::watchdog::snapshot::Snapshot;
use spc_bridge::watchdog::{sector_messages, zone_messages};

const BASE: &str = "base";

fn publish(snapshot: &mut Snapshot, batch: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut published = Vec::new();
    for (topic, value) in batch {
        if snapshot.is_changed(&topic, &value) {
            snapshot.commit(&topic, &value);
            published.push((topic, value));
        }
    }
    published
}

fn home_page(hall_state: &str, sector_state: &str) -> String {
    format!(
        r#"<html><body><title>SPC42</title>
        <table class="gridtable">
          <tr><th>Zone</th><th>Secteur</th><th>Type</th><th>Entrée</th><th>État</th><th></th></tr>
          <tr><td>01 Hall</td><td>1 Maison</td><td>Intrusion</td><td>Fermée</td><td>{}</td><td></td></tr>
        </table>
        <table>
          <tr><td>i</td><td>Secteur 2 : Garage</td><td>{}</td></tr>
        </table>
        </body></html>"#,
        hall_state, sector_state
    )
}

/// Cold start: every metadata field and every parseable state goes out,
/// retained, on the first scan.
#[test]
fn test_cold_start_publishes_initial_state() {
    let mut snapshot = Snapshot::new();
    let page = home_page("Normal", "MHS");

    let mut batch = zone_messages(BASE, &parse_zones(&page));
    batch.extend(sector_messages(BASE, &parse_sectors(&page)));
    let published = publish(&mut snapshot, batch);

    assert!(published.contains(&("base/zones/01/name".to_string(), "01 Hall".to_string())));
    assert!(published.contains(&("base/zones/01/state".to_string(), "0".to_string())));
    assert!(published.contains(&("base/secteurs/2/state".to_string(), "0".to_string())));
}

/// A zone toggling Normal → Activée between two scans yields exactly one
/// publication.
#[test]
fn test_zone_toggle_publishes_exactly_one_topic() {
    let mut snapshot = Snapshot::new();
    let first = home_page("Normal", "MHS");
    let mut batch = zone_messages(BASE, &parse_zones(&first));
    batch.extend(sector_messages(BASE, &parse_sectors(&first)));
    publish(&mut snapshot, batch);

    let second = home_page("Activée", "MHS");
    let mut batch = zone_messages(BASE, &parse_zones(&second));
    batch.extend(sector_messages(BASE, &parse_sectors(&second)));
    let published = publish(&mut snapshot, batch);

    assert_eq!(
        published,
        vec![("base/zones/01/state".to_string(), "1".to_string())]
    );
}

/// Two identical scans: the second publishes nothing at all.
#[test]
fn test_identical_scans_publish_nothing() {
    let mut snapshot = Snapshot::new();
    let page = home_page("Normal", "MES Totale");
    let mut batch = zone_messages(BASE, &parse_zones(&page));
    batch.extend(sector_messages(BASE, &parse_sectors(&page)));
    publish(&mut snapshot, batch);

    let mut batch = zone_messages(BASE, &parse_zones(&page));
    batch.extend(sector_messages(BASE, &parse_sectors(&page)));
    assert!(publish(&mut snapshot, batch).is_empty());
}

/// Every published state lands in its category's closed set; the sentinel
/// never reaches a topic.
#[test]
fn test_published_states_stay_in_closed_sets() {
    let page = home_page("Garbage label", "Some new firmware label");
    let mut batch = zone_messages(BASE, &parse_zones(&page));
    batch.extend(sector_messages(BASE, &parse_sectors(&page)));

    for (topic, value) in &batch {
        assert_ne!(value, "-1", "sentinel leaked to {}", topic);
        if topic.ends_with("/state") && topic.contains("/zones/") {
            assert!(matches!(value.as_str(), "0" | "1"));
        }
        if topic.ends_with("/state") && topic.contains("/secteurs/") {
            assert!(matches!(value.as_str(), "0" | "1" | "2" | "3" | "4"));
        }
    }
}

/// Scenario: `base/secteurs/2/set` payload `mes` — the command pipeline
/// resolves to the MES action and acks `ok:1` on the sibling result topic.
#[test]
fn test_sector_command_round_trip() {
    let (category, id) = topics::parse_set_topic(BASE, "base/secteurs/2/set").unwrap();
    assert_eq!(category, CommandCategory::Secteurs);

    let action = PanelAction::parse(category, "mes").unwrap();
    assert_eq!(action, PanelAction::SectorMes);
    assert_eq!(format!("ok:{}", action.ack_code()), "ok:1");

    assert_eq!(
        topics::command_result_topic(BASE, category, &id),
        "base/secteurs/2/command_result"
    );
}

/// Scenario: garbage payload on a zone `set` topic is rejected before any
/// panel traffic.
#[test]
fn test_bad_payload_rejected_at_validation() {
    let (category, _) = topics::parse_set_topic(BASE, "base/zones/01/set").unwrap();
    assert_eq!(PanelAction::parse(category, "wiggle"), None);
}

/// Commands are validated per category: a door verb on a sector id is a
/// bad payload, not a panel request.
#[test]
fn test_payload_tables_do_not_bleed_across_categories() {
    assert_eq!(PanelAction::parse(CommandCategory::Secteurs, "unlock"), None);
    assert_eq!(PanelAction::parse(CommandCategory::Doors, "mes"), None);
    assert_eq!(PanelAction::parse(CommandCategory::Outputs, "inhibit"), None);
    assert_eq!(PanelAction::parse(CommandCategory::Zones, "partb"), None);
}
