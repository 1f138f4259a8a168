//! Label → state-code mapping.
//!
//! The panel reports state as free-text French labels that vary slightly by
//! firmware. Each category maps through an ordered rule table: the first
//! rule whose needles are all contained in the lowercased label wins.
//! Ordering carries semantics — "MES Partielle B" must be tested before the
//! plain "MES Partielle", and "déverrouillé" before "verrouillé". No rule
//! matching yields the sentinel `-1`, which the publish path drops.

/// One ordered mapping rule: all `needles` must appear in the label.
pub struct LabelRule {
    pub needles: &'static [&'static str],
    pub code: i8,
}

const ZONE_ENTREE_RULES: &[LabelRule] = &[
    LabelRule { needles: &["ferm"], code: 1 },
    LabelRule { needles: &["ouvert"], code: 0 },
];

const ZONE_STATE_RULES: &[LabelRule] = &[
    LabelRule { needles: &["normal"], code: 0 },
    LabelRule { needles: &["activ"], code: 1 },
];

const SECTOR_STATE_RULES: &[LabelRule] = &[
    LabelRule { needles: &["mes totale"], code: 1 },
    LabelRule { needles: &["mes partiel", "b"], code: 3 },
    LabelRule { needles: &["mes partiel"], code: 2 },
    LabelRule { needles: &["mhs"], code: 0 },
    LabelRule { needles: &["désarm"], code: 0 },
    LabelRule { needles: &["alarme"], code: 4 },
];

const DOOR_STATE_RULES: &[LabelRule] = &[
    LabelRule { needles: &["déverrouill"], code: 1 },
    LabelRule { needles: &["accès libre"], code: 1 },
    LabelRule { needles: &["alarme"], code: 4 },
    LabelRule { needles: &["normal"], code: 0 },
    LabelRule { needles: &["verrouill"], code: 0 },
];

const DOOR_DRS_RULES: &[LabelRule] = &[
    LabelRule { needles: &["déverrouill"], code: 1 },
    LabelRule { needles: &["verrouill"], code: 0 },
    LabelRule { needles: &["normal"], code: 0 },
];

const DOOR_DPS_RULES: &[LabelRule] = &[
    LabelRule { needles: &["sabotage"], code: 4 },
    LabelRule { needles: &["masqu"], code: 4 },
    LabelRule { needles: &["court"], code: 2 },
    LabelRule { needles: &["coup"], code: 3 },
    LabelRule { needles: &["ouvert"], code: 1 },
    LabelRule { needles: &["ferm"], code: 0 },
];

/// First rule whose needles all appear in the lowercased label, else -1.
pub fn map_label(rules: &[LabelRule], label: &str) -> i8 {
    let lower = label.to_lowercase();
    for rule in rules {
        if rule.needles.iter().all(|needle| lower.contains(needle)) {
            return rule.code;
        }
    }
    -1
}

pub fn map_zone_entree(label: &str) -> i8 {
    map_label(ZONE_ENTREE_RULES, label)
}

pub fn map_zone_state(label: &str) -> i8 {
    map_label(ZONE_STATE_RULES, label)
}

pub fn map_sector_state(label: &str) -> i8 {
    map_label(SECTOR_STATE_RULES, label)
}

pub fn map_door_state(label: &str) -> i8 {
    map_label(DOOR_STATE_RULES, label)
}

pub fn map_door_drs(label: &str) -> i8 {
    map_label(DOOR_DRS_RULES, label)
}

pub fn map_door_dps(label: &str) -> i8 {
    map_label(DOOR_DPS_RULES, label)
}

/// Output state labels are bare ON/OFF tokens; anything longer is matched
/// exactly after trimming so a label like "fonctionnement" never reads as
/// "on".
pub fn map_output_state(label: &str) -> i8 {
    match label.trim().to_lowercase().as_str() {
        "on" => 1,
        "off" => 0,
        _ => -1,
    }
}

/// Stable entity id derived from a display name: the leading digit run when
/// present, else a slug.
///
/// `"12 Entrée Hall"` → `"12"`, `"Porte Garage"` → `"porte_garage"`,
/// `""` → `"unknown"`.
pub fn zone_id(name: &str) -> String {
    let name = name.trim();
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits;
    }
    slug(name)
}

/// Lowercased with non-alphanumeric runs collapsed to a single `_`,
/// trimmed of leading/trailing underscores; empty input → `"unknown"`.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}
