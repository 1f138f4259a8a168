//! SPC session manager — acquire, cache, validate and refresh the panel
//! session id.
//!
//! The panel expires sessions unpredictably and rate-limits logins, so the
//! manager persists `{"session": sid, "time": unix-float}` under
//! `<session_cache_dir>/spc_session.json` (atomic write) and enforces at
//! most one login attempt per `min_login_interval_sec` window across the
//! whole process. Network failures during validation are never errors:
//! `get_or_login` returns `None` and the caller skips its tick.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::config::SpcConfig;
use crate::panel::client::PanelClient;
use crate::panel::{secure_page, PanelError, PAGE_SECTORS};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    session: String,
    /// Unix timestamp (seconds, fractional) of acquisition.
    time: f64,
}

pub struct SessionManager {
    client: Arc<PanelClient>,
    /// Single-flight gate shared with the scan loops and the command router.
    gate: Arc<tokio::sync::Mutex<()>>,
    session_file: PathBuf,
    min_login_interval: Duration,
    language: u32,
    user: String,
    pin: String,
    /// Last login attempt (success or not) — the rate limit covers both.
    last_login_attempt: std::sync::Mutex<Option<Instant>>,
}

impl SessionManager {
    pub fn new(
        config: &SpcConfig,
        client: Arc<PanelClient>,
        gate: Arc<tokio::sync::Mutex<()>>,
    ) -> Self {
        SessionManager {
            client,
            gate,
            session_file: config.session_file(),
            min_login_interval: Duration::from_secs(config.min_login_interval_sec),
            language: config.language,
            user: config.user.clone(),
            pin: config.pin.clone(),
            last_login_attempt: std::sync::Mutex::new(None),
        }
    }

    /// Return a session id usable right now, logging in if allowed.
    ///
    /// `Ok(None)` means "no session available at the moment" — expired and
    /// inside the re-login window, login rate-limited, or the panel is
    /// unreachable. The only error is an unwritable session cache.
    pub async fn get_or_login(&self) -> Result<Option<String>, PanelError> {
        let _flight = self.gate.lock().await;

        if let Some(record) = self.load_record() {
            if !record.session.is_empty() {
                if self.validate(&record.session).await {
                    return Ok(Some(record.session));
                }
                let age = now_unix() - record.time;
                if age < self.min_login_interval.as_secs_f64() {
                    // Freshly acquired yet invalid: the panel is most likely
                    // mid-restart. Give it a moment and re-check once rather
                    // than spending a login attempt.
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    if self.validate(&record.session).await {
                        return Ok(Some(record.session));
                    }
                    info!(
                        "spc_session: session invalid but only {:.0}s old — deferring re-login",
                        age
                    );
                    return Ok(None);
                }
                info!("spc_session: cached session expired — logging in again");
            }
        }

        if !self.login_allowed() {
            info!("spc_session: login rate limit active — no session this tick");
            return Ok(None);
        }
        self.login().await
    }

    /// GET the home page with the candidate session id and look for the
    /// authenticated markers.
    async fn validate(&self, session_id: &str) -> bool {
        match self.client.get(&secure_page(session_id, PAGE_SECTORS)).await {
            Ok(page) => looks_logged_in(&page.body),
            Err(e) => {
                warn!("spc_session: validation request failed: {}", e);
                false
            }
        }
    }

    async fn login(&self) -> Result<Option<String>, PanelError> {
        if let Ok(mut last) = self.last_login_attempt.lock() {
            *last = Some(Instant::now());
        }

        // Seed cookies; the panel serves a session cookie with the login form.
        if let Err(e) = self.client.get("/login.htm").await {
            warn!("spc_session: login page fetch failed (continuing): {}", e);
        }

        let path = format!("/login.htm?action=login&language={}", self.language);
        let form = [
            ("userid".to_string(), self.user.clone()),
            ("password".to_string(), self.pin.clone()),
        ];
        let page = match self.client.post_form(&path, &form).await {
            Ok(page) => page,
            Err(PanelError::Cache(e)) => return Err(PanelError::Cache(e)),
            Err(e) => {
                warn!("spc_session: login failed: {}", e);
                return Ok(None);
            }
        };

        let session_id = extract_session_id(page.final_url.as_str())
            .or_else(|| extract_session_id(&page.body));
        let Some(session_id) = session_id else {
            warn!("spc_session: login response carried no session id");
            return Ok(None);
        };

        self.save_record(&SessionRecord {
            session: session_id.clone(),
            time: now_unix(),
        })?;
        self.client.save_jar();
        info!("spc_session: 🔐 logged in, session acquired");
        Ok(Some(session_id))
    }

    fn login_allowed(&self) -> bool {
        match self.last_login_attempt.lock() {
            Ok(last) => match *last {
                Some(t) => t.elapsed() >= self.min_login_interval,
                None => true,
            },
            Err(_) => false,
        }
    }

    /// Loaded fresh on every call so an operator-side edit or delete of the
    /// cache file takes effect without a restart.
    fn load_record(&self) -> Option<SessionRecord> {
        let contents = std::fs::read_to_string(&self.session_file).ok()?;
        match serde_json::from_str::<SessionRecord>(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    "spc_session: corrupt cache at {} ({}) — ignoring",
                    self.session_file.display(),
                    e
                );
                None
            }
        }
    }

    /// Atomic write: temp file + rename. An unwritable cache dir is the one
    /// fatal condition of this module.
    fn save_record(&self, record: &SessionRecord) -> Result<(), std::io::Error> {
        if let Some(parent) = self.session_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(record).map_err(std::io::Error::other)?;
        let tmp = self.session_file.with_extension("tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.session_file)?;
        Ok(())
    }
}

/// `true` when the body reads as an authenticated panel page: no login-form
/// markers, and the firmware banner token present.
pub fn looks_logged_in(body: &str) -> bool {
    let lower = body.to_lowercase();
    if lower.contains("login.htm") || lower.contains("mot de passe") || lower.contains("identifiant")
    {
        return false;
    }
    lower.contains("spc42")
}

/// Extract the session token from a URL or HTML body.
///
/// Primary pattern matches `?session=` / `&session=`; the fallback catches
/// ids embedded in `secure.htm` hrefs without a preceding separator match.
pub fn extract_session_id(haystack: &str) -> Option<String> {
    let primary = Regex::new(r"[?&]session=([0-9A-Za-zx]+)").ok()?;
    if let Some(caps) = primary.captures(haystack) {
        return Some(caps[1].to_string());
    }
    let fallback = Regex::new(r#"secure\.htm\?[^"'>]*session=([0-9A-Za-zx]+)"#).ok()?;
    fallback
        .captures(haystack)
        .map(|caps| caps[1].to_string())
}

fn now_unix() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_session_from_final_url() {
        let url = "http://192.168.1.10/secure.htm?session=0xDEAD01&page=spc_home";
        assert_eq!(extract_session_id(url).as_deref(), Some("0xDEAD01"));
    }

    #[test]
    fn test_extract_session_from_body_fallback() {
        let body = r#"<frame src="secure.htm?session=a1B2c3&page=spc_home">"#;
        assert_eq!(extract_session_id(body).as_deref(), Some("a1B2c3"));
    }

    #[test]
    fn test_extract_session_none() {
        assert_eq!(extract_session_id("<html>nothing here</html>"), None);
        assert_eq!(extract_session_id("session: yes"), None);
    }

    #[test]
    fn test_looks_logged_in_markers() {
        assert!(looks_logged_in("<html><title>SPC42</title><td>Secteur 1</td></html>"));
        // Login form markers override the banner token.
        assert!(!looks_logged_in(
            "<html>spc42 <form action=\"login.htm\">Mot de passe</form></html>"
        ));
        assert!(!looks_logged_in("<html>Identifiant: <input></html>"));
        // A page without the banner token is not proof of a session.
        assert!(!looks_logged_in("<html><body>hello</body></html>"));
    }
}
