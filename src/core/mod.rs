pub mod config;
pub mod state;
pub mod types;

pub use state::BridgeState;
