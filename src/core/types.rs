use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity records — produced fresh by each scan, compared against the
// last-published snapshot, then discarded. State fields use closed integer
// sets; -1 is the "unparseable" sentinel and is never published.
// ---------------------------------------------------------------------------

/// An intrusion detection input. `state`: 0 normal, 1 active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    /// Numeric prefix of the zone name when present, else a slug of the name.
    pub id: String,
    pub name: String,
    /// Sector the zone belongs to, as displayed by the panel.
    pub sector: String,
    /// Input contact: 1 closed, 0 open, -1 unparseable.
    pub entree: i8,
    /// 0 normal, 1 active, -1 unparseable.
    pub state: i8,
}

/// An armable grouping of zones. `state`: 0 disarmed (MHS), 1 armed total
/// (MES), 2 partial A, 3 partial B, 4 in alarm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sector {
    /// Panel sector number. `0` is reserved for the synthetic
    /// "Tous Secteurs" global row.
    pub id: u32,
    pub name: String,
    pub state: i8,
}

/// An access-controlled opening with lock and contact sensors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Door {
    pub id: String,
    pub name: String,
    pub zone: String,
    pub sector: String,
    /// 0 normal/locked, 1 unlocked/free access, 4 alarm.
    pub state: i8,
    /// Lock-button state: 0 locked/normal, 1 released.
    pub drs: i8,
    /// Contact sensor: 0 closed, 1 open, 2 short, 3 cut, 4 tamper/masked.
    pub dps: i8,
}

/// A switchable panel output (siren, relay, …).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Output {
    pub id: String,
    pub name: String,
    /// 1 on, 0 off, -1 unparseable.
    pub state: i8,
    /// Raw panel label, published verbatim alongside the mapped state.
    pub state_txt: String,
}

/// One row of the "État Centrale" page: a labelled value under a section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControllerEntry {
    pub section: String,
    pub label: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Command categories
// ---------------------------------------------------------------------------

/// The four controllable/publishable entity categories. Doubles as the topic
/// segment under the MQTT base topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Zones,
    Secteurs,
    Doors,
    Outputs,
}

impl CommandCategory {
    pub const ALL: [CommandCategory; 4] = [
        CommandCategory::Zones,
        CommandCategory::Secteurs,
        CommandCategory::Doors,
        CommandCategory::Outputs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCategory::Zones => "zones",
            CommandCategory::Secteurs => "secteurs",
            CommandCategory::Doors => "doors",
            CommandCategory::Outputs => "outputs",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "zones" => Some(CommandCategory::Zones),
            "secteurs" => Some(CommandCategory::Secteurs),
            "doors" => Some(CommandCategory::Doors),
            "outputs" => Some(CommandCategory::Outputs),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
