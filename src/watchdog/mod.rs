//! Watchdog — the two periodic scan loops and the diff-driven publish path.
//!
//! The fast scan covers zones/sectors/doors/outputs on `refresh_interval`;
//! the controller scan reads the "État Centrale" page on its own slower
//! interval with its own snapshot. Both share the session manager and take
//! the panel gate briefly per page fetch. A failed tick logs once and
//! leaves the snapshot untouched; the next tick starts clean.

pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::types::{ControllerEntry, Door, Output, Sector, Zone};
use crate::core::BridgeState;
use crate::mqtt::publisher::Publisher;
use crate::mqtt::topics;
use crate::panel::{
    secure_page, PanelError, PAGE_CONTROLLER, PAGE_DOORS, PAGE_OUTPUTS, PAGE_SECTORS, PAGE_ZONES,
};
use crate::scraping::controller::parse_controller;
use crate::scraping::doors::parse_doors;
use crate::scraping::outputs::parse_outputs;
use crate::scraping::sectors::parse_sectors;
use crate::scraping::zones::parse_zones;
use snapshot::Snapshot;

// ─────────────────────────────────────────────────────────────────────────────
// Publish planning — pure record → (topic, value) expansion, metadata first
// ─────────────────────────────────────────────────────────────────────────────

pub fn zone_messages(base: &str, zones: &[Zone]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for zone in zones {
        out.push((topics::state_topic(base, "zones", &zone.id, "name"), zone.name.clone()));
        out.push((
            topics::state_topic(base, "zones", &zone.id, "sector"),
            zone.sector.clone(),
        ));
        if zone.state >= 0 {
            out.push((
                topics::state_topic(base, "zones", &zone.id, "state"),
                zone.state.to_string(),
            ));
        }
        if zone.entree >= 0 {
            out.push((
                topics::state_topic(base, "zones", &zone.id, "entree"),
                zone.entree.to_string(),
            ));
        }
    }
    out
}

pub fn sector_messages(base: &str, sectors: &[Sector]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for sector in sectors {
        let id = sector.id.to_string();
        out.push((topics::state_topic(base, "secteurs", &id, "name"), sector.name.clone()));
        if sector.state >= 0 {
            out.push((
                topics::state_topic(base, "secteurs", &id, "state"),
                sector.state.to_string(),
            ));
        }
    }
    out
}

pub fn door_messages(base: &str, doors: &[Door]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for door in doors {
        out.push((topics::state_topic(base, "doors", &door.id, "name"), door.name.clone()));
        out.push((topics::state_topic(base, "doors", &door.id, "zone"), door.zone.clone()));
        out.push((
            topics::state_topic(base, "doors", &door.id, "sector"),
            door.sector.clone(),
        ));
        for (field, value) in [("state", door.state), ("drs", door.drs), ("dps", door.dps)] {
            if value >= 0 {
                out.push((
                    topics::state_topic(base, "doors", &door.id, field),
                    value.to_string(),
                ));
            }
        }
    }
    out
}

pub fn output_messages(base: &str, outputs: &[Output]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for output in outputs {
        out.push((
            topics::state_topic(base, "outputs", &output.id, "name"),
            output.name.clone(),
        ));
        if output.state >= 0 {
            out.push((
                topics::state_topic(base, "outputs", &output.id, "state"),
                output.state.to_string(),
            ));
        }
        if !output.state_txt.is_empty() {
            out.push((
                topics::state_topic(base, "outputs", &output.id, "state_txt"),
                output.state_txt.clone(),
            ));
        }
    }
    out
}

pub fn controller_messages(base: &str, entries: &[ControllerEntry]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|entry| {
            (
                topics::controller_topic(base, &entry.section, &entry.label),
                entry.value.clone(),
            )
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Scan loops
// ─────────────────────────────────────────────────────────────────────────────

pub async fn run_fast_scan(
    state: Arc<BridgeState>,
    publisher: Arc<Publisher>,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs_f64(state.config.watchdog.refresh_interval);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut snapshot = Snapshot::new();

    info!(
        "watchdog: fast scan every {:.1}s (zones={} secteurs={} doors={} outputs={})",
        period.as_secs_f64(),
        state.config.watchdog.information.zones,
        state.config.watchdog.information.secteurs,
        state.config.watchdog.information.doors,
        state.config.watchdog.information.outputs,
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = fast_scan_tick(&state, &publisher, &mut snapshot).await {
                    warn!("watchdog: scan failed, skipping tick: {}", e);
                }
            }
        }
    }
    info!("watchdog: fast scan stopped");
}

pub async fn run_controller_scan(
    state: Arc<BridgeState>,
    publisher: Arc<Publisher>,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs_f64(state.config.watchdog.controller_refresh_interval);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut snapshot = Snapshot::new();

    info!("watchdog: controller scan every {:.0}s", period.as_secs_f64());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = controller_scan_tick(&state, &publisher, &mut snapshot).await {
                    warn!("watchdog: controller scan failed, skipping tick: {}", e);
                }
            }
        }
    }
    info!("watchdog: controller scan stopped");
}

async fn fast_scan_tick(
    state: &BridgeState,
    publisher: &Publisher,
    snapshot: &mut Snapshot,
) -> Result<(), PanelError> {
    let Some(session_id) = state.session.get_or_login().await? else {
        info!("watchdog: no panel session — nothing published this tick");
        return Ok(());
    };

    let base = &state.config.mqtt.base_topic;
    let information = &state.config.watchdog.information;
    let mut batch: Vec<(String, String)> = Vec::new();

    if information.zones {
        let body = fetch_page(state, &session_id, PAGE_ZONES).await?;
        batch.extend(zone_messages(base, &parse_zones(&body)));
    }
    if information.secteurs {
        let body = fetch_page(state, &session_id, PAGE_SECTORS).await?;
        batch.extend(sector_messages(base, &parse_sectors(&body)));
    }
    if information.doors {
        let body = fetch_page(state, &session_id, PAGE_DOORS).await?;
        batch.extend(door_messages(base, &parse_doors(&body)));
    }
    if information.outputs {
        let body = fetch_page(state, &session_id, PAGE_OUTPUTS).await?;
        batch.extend(output_messages(base, &parse_outputs(&body)));
    }

    publish_batch(state, publisher, snapshot, batch).await;
    Ok(())
}

async fn controller_scan_tick(
    state: &BridgeState,
    publisher: &Publisher,
    snapshot: &mut Snapshot,
) -> Result<(), PanelError> {
    let Some(session_id) = state.session.get_or_login().await? else {
        return Ok(());
    };
    let body = fetch_page(state, &session_id, PAGE_CONTROLLER).await?;
    let batch = controller_messages(&state.config.mqtt.base_topic, &parse_controller(&body));
    publish_batch(state, publisher, snapshot, batch).await;
    Ok(())
}

/// One authenticated page fetch under the panel gate.
async fn fetch_page(
    state: &BridgeState,
    session_id: &str,
    page: &str,
) -> Result<String, PanelError> {
    let _flight = state.panel_gate.lock().await;
    let response = state.panel.get(&secure_page(session_id, page)).await?;
    Ok(response.body)
}

/// Diff the batch against the snapshot and publish what changed, committing
/// only values the client accepted.
async fn publish_batch(
    state: &BridgeState,
    publisher: &Publisher,
    snapshot: &mut Snapshot,
    batch: Vec<(String, String)>,
) {
    let log_changes = state.config.watchdog.log_changes;
    for (topic, value) in batch {
        if !snapshot.is_changed(&topic, &value) {
            continue;
        }
        if publisher.publish_state(&topic, &value).await {
            snapshot.commit(&topic, &value);
            if log_changes {
                info!("watchdog: {} = {}", topic, value);
            }
        }
    }
}
