//! Panel action execution — replay the HTML form submission a web-UI button
//! would issue.
//!
//! The SPC pages render one row per entity, each row carrying the action
//! controls (submit buttons inside a form, or bare links). Nothing about
//! those controls is stable across firmware revisions except their French
//! labels, so execution is two-phased: a pure discovery pass over the
//! freshly-fetched page HTML picks the control for `(entity, action)`, then
//! the resolved request is submitted through the shared client.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::core::types::CommandCategory;
use crate::panel::client::{Page, PanelClient};
use crate::panel::{secure_page, PanelError, PAGE_DOORS, PAGE_OUTPUTS, PAGE_SECTORS, PAGE_ZONES};
use crate::scraping::mappers::zone_id;

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

/// Every command the MQTT surface accepts, one variant per panel button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    SectorMhs,
    SectorMes,
    SectorPartA,
    SectorPartB,
    DoorNormal,
    DoorLock,
    DoorUnlock,
    DoorPulse,
    OutputOn,
    OutputOff,
    ZoneInhibit,
    ZoneUninhibit,
    ZoneIsolate,
    ZoneUnisolate,
    ZoneTestJdb,
    ZoneRestore,
}

impl PanelAction {
    /// Validate a raw MQTT payload for a category. Matching is exact on the
    /// trimmed, lowercased payload — never substring, so `part` and `partb`
    /// stay distinct.
    pub fn parse(category: CommandCategory, payload: &str) -> Option<PanelAction> {
        let p = payload.trim().to_lowercase();
        match category {
            CommandCategory::Secteurs => match p.as_str() {
                "0" | "mhs" => Some(PanelAction::SectorMhs),
                "1" | "mes" => Some(PanelAction::SectorMes),
                "2" | "part" => Some(PanelAction::SectorPartA),
                "3" | "partb" => Some(PanelAction::SectorPartB),
                _ => None,
            },
            CommandCategory::Doors => match p.as_str() {
                "normal" => Some(PanelAction::DoorNormal),
                "lock" => Some(PanelAction::DoorLock),
                "unlock" => Some(PanelAction::DoorUnlock),
                "pulse" => Some(PanelAction::DoorPulse),
                _ => None,
            },
            CommandCategory::Outputs => match p.as_str() {
                "1" | "on" => Some(PanelAction::OutputOn),
                "0" | "off" => Some(PanelAction::OutputOff),
                _ => None,
            },
            CommandCategory::Zones => match p.as_str() {
                "inhibit" => Some(PanelAction::ZoneInhibit),
                "uninhibit" => Some(PanelAction::ZoneUninhibit),
                "isolate" => Some(PanelAction::ZoneIsolate),
                "unisolate" => Some(PanelAction::ZoneUnisolate),
                "testjdb" => Some(PanelAction::ZoneTestJdb),
                "restore" => Some(PanelAction::ZoneRestore),
                _ => None,
            },
        }
    }

    /// The `ok:` ack payload: target state code for sectors, textual action
    /// for everything else.
    pub fn ack_code(&self) -> &'static str {
        match self {
            PanelAction::SectorMhs => "0",
            PanelAction::SectorMes => "1",
            PanelAction::SectorPartA => "2",
            PanelAction::SectorPartB => "3",
            PanelAction::DoorNormal => "normal",
            PanelAction::DoorLock => "lock",
            PanelAction::DoorUnlock => "unlock",
            PanelAction::DoorPulse => "pulse",
            PanelAction::OutputOn => "on",
            PanelAction::OutputOff => "off",
            PanelAction::ZoneInhibit => "inhibit",
            PanelAction::ZoneUninhibit => "uninhibit",
            PanelAction::ZoneIsolate => "isolate",
            PanelAction::ZoneUnisolate => "unisolate",
            PanelAction::ZoneTestJdb => "testjdb",
            PanelAction::ZoneRestore => "restore",
        }
    }

    /// Substrings that identify the button label on the panel page
    /// (lowercased comparison).
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            PanelAction::SectorMhs => &["mhs"],
            PanelAction::SectorMes => &["mes totale", "mes"],
            PanelAction::SectorPartA => &["partielle a", "partiel a", "parta"],
            PanelAction::SectorPartB => &["partielle b", "partiel b", "partb"],
            PanelAction::DoorNormal => &["normal"],
            PanelAction::DoorLock => &["verrouill"],
            PanelAction::DoorUnlock => &["déverrouill", "deverrouill", "libre"],
            PanelAction::DoorPulse => &["impulsion", "momentan", "pulse"],
            PanelAction::OutputOn => &["on", "marche", "activer"],
            PanelAction::OutputOff => &["off", "arrêt", "arret", "désactiver"],
            PanelAction::ZoneInhibit => &["inhib"],
            PanelAction::ZoneUninhibit => &["désinhib", "desinhib"],
            PanelAction::ZoneIsolate => &["isol"],
            PanelAction::ZoneUnisolate => &["désisol", "desisol"],
            PanelAction::ZoneTestJdb => &["test"],
            PanelAction::ZoneRestore => &["rétabli", "retabli", "restaur"],
        }
    }

    /// Substrings that disqualify a label even when a keyword matched —
    /// e.g. "Désinhiber" contains "inhib" but belongs to the opposite action.
    fn excludes(&self) -> &'static [&'static str] {
        match self {
            PanelAction::SectorMhs => &["partiel"],
            PanelAction::SectorMes => &["partiel", "mhs"],
            PanelAction::SectorPartA => &["partielle b", "partiel b", "partb"],
            PanelAction::DoorLock => &["déverrouill", "deverrouill"],
            PanelAction::OutputOn => &["off", "arrêt", "arret", "désactiv"],
            PanelAction::ZoneInhibit => &["désinhib", "desinhib"],
            PanelAction::ZoneIsolate => &["désisol", "desisol"],
            _ => &[],
        }
    }

    /// The page whose rows carry this action's buttons.
    pub fn page(&self) -> &'static str {
        match self {
            PanelAction::SectorMhs
            | PanelAction::SectorMes
            | PanelAction::SectorPartA
            | PanelAction::SectorPartB => PAGE_SECTORS,
            PanelAction::DoorNormal
            | PanelAction::DoorLock
            | PanelAction::DoorUnlock
            | PanelAction::DoorPulse => PAGE_DOORS,
            PanelAction::OutputOn | PanelAction::OutputOff => PAGE_OUTPUTS,
            PanelAction::ZoneInhibit
            | PanelAction::ZoneUninhibit
            | PanelAction::ZoneIsolate
            | PanelAction::ZoneUnisolate
            | PanelAction::ZoneTestJdb
            | PanelAction::ZoneRestore => PAGE_ZONES,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// A fully-resolved request ready to hand to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRequest {
    pub method: FormMethod,
    pub url: Url,
    pub fields: Vec<(String, String)>,
}

/// Pure discovery: locate the control for `(entity_id, action)` in a page.
///
/// Scans each table row whose cells identify the entity; inside the row,
/// prefers a submit control (hidden inputs of the enclosing form + the
/// button's own name/value become the body), falls back to an action link.
/// Returns `None` when no row or no control matches.
pub fn discover_request(
    html: &str,
    page_url: &Url,
    entity_id: &str,
    action: &PanelAction,
) -> Option<DiscoveredRequest> {
    let document = Html::parse_document(html);
    let tr_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("td, th").ok()?;
    let submit_sel = Selector::parse("input[type=submit], button").ok()?;
    let link_sel = Selector::parse("a[href]").ok()?;

    for row in document.select(&tr_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if !row_matches_entity(&cells, entity_id) && !hidden_field_matches(&row, entity_id) {
            continue;
        }

        // Submit buttons first: the web UI drives everything through forms.
        for button in row.select(&submit_sel) {
            let label = button_label(&button);
            if !label_matches(&label, action) {
                continue;
            }
            if let Some(request) = form_request(&button, page_url) {
                return Some(request);
            }
        }

        // Fallback: a bare action link in the row.
        for link in row.select(&link_sel) {
            let label = link.text().collect::<String>();
            let href = link.value().attr("href").unwrap_or_default();
            let haystack = format!("{} {}", label, href);
            if !label_matches(&haystack, action) {
                continue;
            }
            if let Ok(url) = page_url.join(href) {
                return Some(DiscoveredRequest {
                    method: FormMethod::Get,
                    url,
                    fields: Vec::new(),
                });
            }
        }
    }

    debug!(
        "actions: no control for entity '{}' action {:?}",
        entity_id, action
    );
    None
}

/// Execute `(category, entity_id, action)` end to end: fetch the page,
/// discover the control, submit it. Caller holds the panel gate.
pub async fn execute(
    client: &PanelClient,
    session_id: &str,
    category: CommandCategory,
    entity_id: &str,
    action: &PanelAction,
) -> Result<(), PanelError> {
    let page: Page = client.get(&secure_page(session_id, action.page())).await?;
    let request = discover_request(&page.body, &page.final_url, entity_id, action)
        .ok_or(PanelError::ActionNotFound)?;
    debug!(
        "actions: {} {} → {:?} {}",
        category, entity_id, request.method, request.url
    );
    match request.method {
        FormMethod::Get => client.get_url(request.url).await?,
        FormMethod::Post => client.post_form_url(request.url, &request.fields).await?,
    };
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Row / label matching helpers
// ─────────────────────────────────────────────────────────────────────────────

/// A row belongs to the entity when any cell is the id itself, derives to it
/// (`zone_id` on the cell text), or is a "Secteur <id> :" label.
fn row_matches_entity(cells: &[String], entity_id: &str) -> bool {
    for cell in cells {
        let trimmed = cell.trim();
        if trimmed == entity_id || zone_id(trimmed) == entity_id {
            return true;
        }
        if let Some(rest) = trimmed
            .to_lowercase()
            .strip_prefix("secteur")
            .map(str::trim_start)
        {
            if rest
                .strip_prefix(entity_id)
                .map(|after| after.trim_start().starts_with(':') || after.is_empty())
                .unwrap_or(false)
            {
                return true;
            }
        }
    }
    false
}

/// Rows also qualify through a hidden input carrying the entity id
/// (`<input type=hidden name=zone value=3>`).
fn hidden_field_matches(row: &ElementRef<'_>, entity_id: &str) -> bool {
    let Ok(hidden_sel) = Selector::parse("input[type=hidden]") else {
        return false;
    };
    row.select(&hidden_sel)
        .any(|input| input.value().attr("value").map(str::trim) == Some(entity_id))
}

fn button_label(button: &ElementRef<'_>) -> String {
    let value = button.value().attr("value").unwrap_or_default();
    let name = button.value().attr("name").unwrap_or_default();
    let text = button.text().collect::<String>();
    format!("{} {} {}", value, name, text)
}

/// Keyword match with exclusions. Short keywords (≤ 3 chars, e.g. "on",
/// "mes") must match a whole word so "désactivation" never reads as "on".
fn label_matches(label: &str, action: &PanelAction) -> bool {
    let lower = label.to_lowercase();
    if action.excludes().iter().any(|ex| lower.contains(ex)) {
        return false;
    }
    action.keywords().iter().any(|kw| {
        if kw.chars().count() <= 3 {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == *kw)
        } else {
            lower.contains(kw)
        }
    })
}

/// Walk up from a submit control to its `form`, collect hidden inputs plus
/// the control's own name/value pair, and resolve the action URL.
fn form_request(button: &ElementRef<'_>, page_url: &Url) -> Option<DiscoveredRequest> {
    let mut node = button.parent();
    let form = loop {
        let current = node?;
        if let Some(element) = ElementRef::wrap(current) {
            if element.value().name() == "form" {
                break element;
            }
        }
        node = current.parent();
    };

    let mut fields: Vec<(String, String)> = Vec::new();
    if let Ok(hidden_sel) = Selector::parse("input[type=hidden]") {
        for input in form.select(&hidden_sel) {
            if let Some(name) = input.value().attr("name") {
                let value = input.value().attr("value").unwrap_or_default();
                fields.push((name.to_string(), value.to_string()));
            }
        }
    }
    if let Some(name) = button.value().attr("name") {
        let value = button.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }

    let target = form.value().attr("action").unwrap_or("");
    let url = if target.is_empty() {
        page_url.clone()
    } else {
        page_url.join(target).ok()?
    };
    let method = match form
        .value()
        .attr("method")
        .unwrap_or("get")
        .to_ascii_lowercase()
        .as_str()
    {
        "post" => FormMethod::Post,
        _ => FormMethod::Get,
    };

    Some(DiscoveredRequest {
        method,
        url,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    const SECTOR_PAGE: &str = r#"
    <html><body><table>
      <tr>
        <td>1</td><td>Secteur 2 : Maison</td><td>MHS</td>
        <td>
          <form action="secure.htm?session=0xAB&page=spc_home" method="post">
            <input type="hidden" name="sector" value="2">
            <input type="submit" name="setmode" value="MES Totale">
            <input type="submit" name="setmode" value="MES Partielle A">
            <input type="submit" name="setmode" value="MES Partielle B">
            <input type="submit" name="setmode" value="MHS">
          </form>
        </td>
      </tr>
    </table></body></html>"#;

    #[test]
    fn test_parse_payload_table() {
        use CommandCategory::*;
        assert_eq!(
            PanelAction::parse(Secteurs, " MES "),
            Some(PanelAction::SectorMes)
        );
        assert_eq!(PanelAction::parse(Secteurs, "0"), Some(PanelAction::SectorMhs));
        assert_eq!(
            PanelAction::parse(Secteurs, "partb"),
            Some(PanelAction::SectorPartB)
        );
        assert_eq!(
            PanelAction::parse(Secteurs, "part"),
            Some(PanelAction::SectorPartA)
        );
        assert_eq!(PanelAction::parse(Secteurs, "wiggle"), None);
        assert_eq!(
            PanelAction::parse(Doors, "UNLOCK"),
            Some(PanelAction::DoorUnlock)
        );
        assert_eq!(PanelAction::parse(Outputs, "1"), Some(PanelAction::OutputOn));
        assert_eq!(PanelAction::parse(Outputs, "off"), Some(PanelAction::OutputOff));
        assert_eq!(
            PanelAction::parse(Zones, "testjdb"),
            Some(PanelAction::ZoneTestJdb)
        );
        assert_eq!(PanelAction::parse(Zones, "wiggle"), None);
    }

    #[test]
    fn test_ack_codes() {
        assert_eq!(PanelAction::SectorMes.ack_code(), "1");
        assert_eq!(PanelAction::SectorPartB.ack_code(), "3");
        assert_eq!(PanelAction::DoorUnlock.ack_code(), "unlock");
        assert_eq!(PanelAction::OutputOn.ack_code(), "on");
        assert_eq!(PanelAction::ZoneInhibit.ack_code(), "inhibit");
    }

    #[test]
    fn test_discover_sector_mes_picks_the_right_button() {
        let page_url = url("http://panel.local/secure.htm?session=0xAB&page=spc_home");
        let request =
            discover_request(SECTOR_PAGE, &page_url, "2", &PanelAction::SectorMes).unwrap();
        assert_eq!(request.method, FormMethod::Post);
        assert!(request.url.as_str().contains("page=spc_home"));
        assert!(request
            .fields
            .contains(&("sector".to_string(), "2".to_string())));
        assert!(request
            .fields
            .contains(&("setmode".to_string(), "MES Totale".to_string())));
        // The partial buttons must not leak into a full-set request.
        assert!(!request
            .fields
            .iter()
            .any(|(_, v)| v.contains("Partielle")));
    }

    #[test]
    fn test_discover_part_b_vs_part_a() {
        let page_url = url("http://panel.local/secure.htm?session=0xAB&page=spc_home");
        let b = discover_request(SECTOR_PAGE, &page_url, "2", &PanelAction::SectorPartB).unwrap();
        assert!(b
            .fields
            .contains(&("setmode".to_string(), "MES Partielle B".to_string())));
        let a = discover_request(SECTOR_PAGE, &page_url, "2", &PanelAction::SectorPartA).unwrap();
        assert!(a
            .fields
            .contains(&("setmode".to_string(), "MES Partielle A".to_string())));
    }

    #[test]
    fn test_discover_wrong_entity_returns_none() {
        let page_url = url("http://panel.local/secure.htm?session=0xAB&page=spc_home");
        assert!(discover_request(SECTOR_PAGE, &page_url, "9", &PanelAction::SectorMes).is_none());
    }

    #[test]
    fn test_discover_output_link_fallback() {
        let html = r#"
        <table><tr>
          <td>3 Sirène</td><td>OFF</td>
          <td><a href="secure.htm?session=0xAB&page=status_outputs&output=3&mode=on">Marche</a></td>
        </tr></table>"#;
        let page_url = url("http://panel.local/secure.htm?session=0xAB&page=status_outputs");
        let request = discover_request(html, &page_url, "3", &PanelAction::OutputOn).unwrap();
        assert_eq!(request.method, FormMethod::Get);
        assert!(request.url.as_str().contains("mode=on"));
    }

    #[test]
    fn test_short_keyword_needs_word_boundary() {
        // "Désactivation" contains "on" as a substring but not as a word.
        assert!(!label_matches("Désactivation", &PanelAction::OutputOn));
        assert!(label_matches("ON", &PanelAction::OutputOn));
        assert!(label_matches("Marche forcée", &PanelAction::OutputOn));
        // "Désinhiber" must never satisfy the inhibit action.
        assert!(!label_matches("Désinhiber", &PanelAction::ZoneInhibit));
        assert!(label_matches("Inhiber", &PanelAction::ZoneInhibit));
    }
}
