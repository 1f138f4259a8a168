pub mod core;
pub mod mqtt;
pub mod panel;
pub mod scraping;
pub mod watchdog;

// --- Primary core exports ---
pub use core::config::Config;
pub use core::types;
pub use core::types::*;
pub use core::BridgeState;

pub use panel::client::PanelClient;
pub use panel::session::SessionManager;
pub use panel::PanelError;
