pub mod actions;
pub mod client;
pub mod cookies;
pub mod session;

/// Page ids passed as `?page=` to `/secure.htm`.
pub const PAGE_ZONES: &str = "status_zones";
pub const PAGE_SECTORS: &str = "spc_home";
pub const PAGE_DOORS: &str = "status_doors";
pub const PAGE_OUTPUTS: &str = "status_outputs";
pub const PAGE_CONTROLLER: &str = "status_controller";

/// Errors crossing the panel boundary. Everything here is transient for the
/// scan loops (skip the tick) except `Cache`, which means the state
/// directory stopped being writable.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("panel returned HTTP {0}")]
    Http(u16),
    #[error("invalid panel URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no matching action control on the panel page")]
    ActionNotFound,
    #[error("session cache unwritable: {0}")]
    Cache(#[from] std::io::Error),
}

/// Path-and-query for an authenticated panel page.
pub fn secure_page(session_id: &str, page: &str) -> String {
    format!("/secure.htm?session={}&page={}", session_id, page)
}
