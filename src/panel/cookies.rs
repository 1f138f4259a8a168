//! Durable cookie jar for the panel HTTP client.
//!
//! The panel keeps its session id in URLs, not cookies, but still sets a few
//! cookies at login that later requests must echo. The jar is a plain
//! mapping from cookie name to value + attributes, persisted as JSON under
//! `<session_cache_dir>/spc_cookies.jar` and reloaded at startup. Writes are
//! atomic (write-to-temp then rename) so another reader never observes a
//! truncated file. A corrupt file is deleted and replaced with an empty jar.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Unix timestamp (seconds). `None` = session-scoped, kept until restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieJar {
    cookies: BTreeMap<String, StoredCookie>,
}

impl CookieJar {
    /// Load the jar from disk. Missing file → empty jar; corrupt file →
    /// deleted, empty jar.
    pub fn load(path: &Path) -> CookieJar {
        let contents = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return CookieJar::default(),
        };
        match serde_json::from_str::<CookieJar>(&contents) {
            Ok(jar) => {
                info!("cookies: loaded {} cookies from {}", jar.cookies.len(), path.display());
                jar
            }
            Err(e) => {
                warn!(
                    "cookies: corrupt jar at {} ({}) — deleting and starting empty",
                    path.display(),
                    e
                );
                let _ = std::fs::remove_file(path);
                CookieJar::default()
            }
        }
    }

    /// Persist the jar atomically. Best-effort: failures are logged, never
    /// surfaced.
    pub fn save(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("cookies: failed to create {}: {}", parent.display(), e);
                return;
            }
        }
        let json = match serde_json::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => {
                warn!("cookies: serialization failed: {}", e);
                return;
            }
        };
        let tmp = path.with_extension("tmp");
        if let Err(e) = std::fs::write(&tmp, &json) {
            warn!("cookies: failed to write {}: {}", tmp.display(), e);
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, path) {
            warn!(
                "cookies: failed to rename {} → {}: {}",
                tmp.display(),
                path.display(),
                e
            );
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for the `Cookie` request header, expired cookies skipped.
    /// `None` when the jar has nothing to send.
    pub fn header_value(&self) -> Option<String> {
        let now = chrono::Utc::now().timestamp() as f64;
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|(_, c)| c.expires.map(|exp| exp > now).unwrap_or(true))
            .map(|(name, c)| format!("{}={}", name, c.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Absorb every `Set-Cookie` header of a response.
    pub fn store_response(&mut self, headers: &reqwest::header::HeaderMap) {
        for value in headers.get_all(reqwest::header::SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                if let Some((name, cookie)) = parse_set_cookie(raw) {
                    self.cookies.insert(name, cookie);
                }
            }
        }
    }
}

/// Parse a single `Set-Cookie` header line into (name, attributes).
///
/// Follows the pragmatic subset the panel emits: `name=value` first, then
/// `;`-separated attributes of which `Domain`, `Path`, `Max-Age` and
/// `Expires` are kept. `Max-Age` wins over `Expires` when both are present.
fn parse_set_cookie(raw: &str) -> Option<(String, StoredCookie)> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let mut cookie = StoredCookie {
        value: value.trim().to_string(),
        domain: None,
        path: None,
        expires: None,
    };
    let mut max_age: Option<f64> = None;
    for attr in parts {
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim()),
            None => continue, // valueless attributes (Secure, HttpOnly) — irrelevant here
        };
        match key.as_str() {
            "domain" => cookie.domain = Some(val.to_string()),
            "path" => cookie.path = Some(val.to_string()),
            "max-age" => max_age = val.parse::<f64>().ok(),
            "expires" => {
                if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(val) {
                    cookie.expires = Some(dt.timestamp() as f64);
                }
            }
            _ => {}
        }
    }
    if let Some(secs) = max_age {
        cookie.expires = Some(chrono::Utc::now().timestamp() as f64 + secs);
    }
    Some((name.to_string(), cookie))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_cookie_basic() {
        let (name, cookie) = parse_set_cookie("SMSESS=abc123; Path=/; HttpOnly").unwrap();
        assert_eq!(name, "SMSESS");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert!(cookie.expires.is_none());
    }

    #[test]
    fn test_parse_set_cookie_max_age_wins_over_expires() {
        let (_, cookie) = parse_set_cookie(
            "k=v; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=3600",
        )
        .unwrap();
        let now = chrono::Utc::now().timestamp() as f64;
        let exp = cookie.expires.unwrap();
        assert!((exp - (now + 3600.0)).abs() < 60.0);
    }

    #[test]
    fn test_header_value_skips_expired() {
        let mut jar = CookieJar::default();
        jar.cookies.insert(
            "fresh".into(),
            StoredCookie {
                value: "1".into(),
                domain: None,
                path: None,
                expires: None,
            },
        );
        jar.cookies.insert(
            "stale".into(),
            StoredCookie {
                value: "2".into(),
                domain: None,
                path: None,
                expires: Some(1.0),
            },
        );
        assert_eq!(jar.header_value().unwrap(), "fresh=1");
    }

    #[test]
    fn test_round_trip_and_corrupt_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spc_cookies.jar");

        let mut jar = CookieJar::default();
        jar.cookies.insert(
            "SMSESS".into(),
            StoredCookie {
                value: "abc".into(),
                domain: Some("panel.local".into()),
                path: Some("/".into()),
                expires: None,
            },
        );
        jar.save(&path);
        // No temp file left behind after an atomic save.
        assert!(!path.with_extension("tmp").exists());

        let reloaded = CookieJar::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.header_value().unwrap(), "SMSESS=abc");

        std::fs::write(&path, "{not json").unwrap();
        let recovered = CookieJar::load(&path);
        assert!(recovered.is_empty());
        assert!(!path.exists(), "corrupt jar should be deleted");
    }
}
