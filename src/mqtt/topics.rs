//! Topic layout under the configured base topic.
//!
//! State:   `<base>/<category>/<id>/<field>` (retained)
//! Control: `<base>/<category>/<id>/set` → `<base>/<category>/<id>/command_result`
//! Controller status: `<base>/etat/<section>/<label>`

use crate::core::types::CommandCategory;
use crate::scraping::mappers::slug;

pub fn state_topic(base: &str, category: &str, id: &str, field: &str) -> String {
    format!("{}/{}/{}/{}", base, category, id, field)
}

pub fn controller_topic(base: &str, section: &str, label: &str) -> String {
    format!("{}/etat/{}/{}", base, slug(section), slug(label))
}

pub fn command_result_topic(base: &str, category: CommandCategory, id: &str) -> String {
    format!("{}/{}/{}/command_result", base, category.as_str(), id)
}

/// Subscription filter for a controllable category.
pub fn set_filter(base: &str, category: CommandCategory) -> String {
    format!("{}/{}/+/set", base, category.as_str())
}

/// Parse an incoming `<base>/<category>/<id>/set` topic.
///
/// Anything else — wrong base, unknown category, empty or nested id,
/// missing `set` leaf — is rejected with `None`.
pub fn parse_set_topic(base: &str, topic: &str) -> Option<(CommandCategory, String)> {
    let rest = topic.strip_prefix(base)?.strip_prefix('/')?;
    let mut segments = rest.split('/');
    let category = CommandCategory::from_segment(segments.next()?)?;
    let id = segments.next()?;
    if id.is_empty() || segments.next()? != "set" || segments.next().is_some() {
        return None;
    }
    Some((category, id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_layout() {
        assert_eq!(
            state_topic("spc", "zones", "01", "state"),
            "spc/zones/01/state"
        );
        assert_eq!(
            command_result_topic("spc", CommandCategory::Secteurs, "2"),
            "spc/secteurs/2/command_result"
        );
        assert_eq!(set_filter("spc", CommandCategory::Doors), "spc/doors/+/set");
        assert_eq!(
            controller_topic("spc", "Alimentation", "Tension secteur"),
            "spc/etat/alimentation/tension_secteur"
        );
    }

    #[test]
    fn test_parse_set_topic_accepts_well_formed() {
        assert_eq!(
            parse_set_topic("spc", "spc/secteurs/2/set"),
            Some((CommandCategory::Secteurs, "2".to_string()))
        );
        assert_eq!(
            parse_set_topic("spc", "spc/zones/porte_garage/set"),
            Some((CommandCategory::Zones, "porte_garage".to_string()))
        );
    }

    #[test]
    fn test_parse_set_topic_rejects_malformed() {
        assert_eq!(parse_set_topic("spc", "other/zones/01/set"), None);
        assert_eq!(parse_set_topic("spc", "spc/garage/01/set"), None);
        assert_eq!(parse_set_topic("spc", "spc/zones/set"), None);
        assert_eq!(parse_set_topic("spc", "spc/zones//set"), None);
        assert_eq!(parse_set_topic("spc", "spc/zones/01/get"), None);
        assert_eq!(parse_set_topic("spc", "spc/zones/01/set/extra"), None);
        assert_eq!(parse_set_topic("spc", "spc/zones/01/state"), None);
    }
}
