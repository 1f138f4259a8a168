use std::sync::Arc;

use crate::core::config::Config;
use crate::panel::client::PanelClient;
use crate::panel::session::SessionManager;

/// Shared handle threaded through the scan loops and the command router.
///
/// `panel_gate` is the single-flight discipline over the panel: the session
/// manager holds it for a whole validate/login unit, the scan loops take it
/// briefly per page fetch, and the command router holds it for a whole
/// fetch-discover-submit unit. The panel's session model is not safe for
/// interleaved mutations.
pub struct BridgeState {
    pub config: Config,
    pub panel: Arc<PanelClient>,
    pub session: Arc<SessionManager>,
    pub panel_gate: Arc<tokio::sync::Mutex<()>>,
}

impl std::fmt::Debug for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeState")
            .field("panel_host", &self.config.spc.host)
            .field("base_topic", &self.config.mqtt.base_topic)
            .finish()
    }
}

impl BridgeState {
    pub fn new(config: Config, panel: Arc<PanelClient>) -> Self {
        let panel_gate = Arc::new(tokio::sync::Mutex::new(()));
        let session = Arc::new(SessionManager::new(
            &config.spc,
            Arc::clone(&panel),
            Arc::clone(&panel_gate),
        ));
        BridgeState {
            config,
            panel,
            session,
            panel_gate,
        }
    }
}
