use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::types::CommandCategory;

// ---------------------------------------------------------------------------
// Config — YAML file selected with `-c <path>`, immutable after load.
// Anything invalid here is fatal before the main loop starts.
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub spc: SpcConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

/// Panel connection block. `host` accepts `host`, `host:port` or a full
/// `http(s)://` prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct SpcConfig {
    pub host: String,
    pub user: String,
    pub pin: String,
    /// Panel UI language id sent at login.
    #[serde(default = "default_language")]
    pub language: u32,
    pub session_cache_dir: PathBuf,
    #[serde(default = "default_min_login_interval")]
    pub min_login_interval_sec: u64,
}

impl SpcConfig {
    /// Base URL of the panel, scheme defaulting to plain http.
    pub fn base_url(&self) -> Result<url::Url, ConfigError> {
        let raw = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("http://{}", self.host)
        };
        url::Url::parse(&raw)
            .map_err(|e| ConfigError::Invalid(format!("spc.host '{}': {}", self.host, e)))
    }

    pub fn session_file(&self) -> PathBuf {
        self.session_cache_dir.join("spc_session.json")
    }

    pub fn cookie_jar_file(&self) -> PathBuf {
        self.session_cache_dir.join("spc_cookies.jar")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_qos")]
    pub qos: u8,
    #[serde(default = "default_true")]
    pub retain: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    /// Fast-scan period in seconds (zones, sectors, doors, outputs).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: f64,
    /// Controller-status scan period in seconds.
    #[serde(default = "default_controller_refresh_interval")]
    pub controller_refresh_interval: f64,
    #[serde(default = "default_true")]
    pub log_changes: bool,
    #[serde(default = "FlagMatrix::default_information")]
    pub information: FlagMatrix,
    #[serde(default)]
    pub controle: FlagMatrix,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        WatchdogConfig {
            refresh_interval: default_refresh_interval(),
            controller_refresh_interval: default_controller_refresh_interval(),
            log_changes: true,
            information: FlagMatrix::default_information(),
            controle: FlagMatrix::default(),
        }
    }
}

/// Per-category boolean gate, used twice: `information` (publication) and
/// `controle` (command subscription + execution). Immutable for the process
/// lifetime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlagMatrix {
    #[serde(default)]
    pub zones: bool,
    #[serde(default)]
    pub secteurs: bool,
    #[serde(default)]
    pub doors: bool,
    #[serde(default)]
    pub outputs: bool,
}

impl FlagMatrix {
    fn default_information() -> Self {
        FlagMatrix {
            zones: true,
            secteurs: true,
            doors: false,
            outputs: false,
        }
    }

    pub fn enabled(&self, category: CommandCategory) -> bool {
        match category {
            CommandCategory::Zones => self.zones,
            CommandCategory::Secteurs => self.secteurs,
            CommandCategory::Doors => self.doors,
            CommandCategory::Outputs => self.outputs,
        }
    }

    /// Categories with the flag set, in publication order.
    pub fn enabled_categories(&self) -> Vec<CommandCategory> {
        CommandCategory::ALL
            .into_iter()
            .filter(|c| self.enabled(*c))
            .collect()
    }
}

fn default_language() -> u32 {
    253
}
fn default_min_login_interval() -> u64 {
    120
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_base_topic() -> String {
    "spc".to_string()
}
fn default_client_id() -> String {
    "spc-bridge".to_string()
}
fn default_qos() -> u8 {
    1
}
fn default_true() -> bool {
    true
}
fn default_refresh_interval() -> f64 {
    2.0
}
fn default_controller_refresh_interval() -> f64 {
    60.0
}

impl Config {
    /// Load and validate the YAML config at `path`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.spc.host.trim().is_empty() {
            return Err(ConfigError::Invalid("spc.host is empty".into()));
        }
        self.spc.base_url()?;
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.host is empty".into()));
        }
        if self.mqtt.base_topic.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.base_topic is empty".into()));
        }
        if self.mqtt.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.client_id is empty".into()));
        }
        if self.mqtt.qos > 2 {
            return Err(ConfigError::Invalid(format!(
                "mqtt.qos must be 0, 1 or 2 (got {})",
                self.mqtt.qos
            )));
        }
        if self.watchdog.refresh_interval < 0.2 {
            return Err(ConfigError::Invalid(format!(
                "watchdog.refresh_interval must be >= 0.2s (got {})",
                self.watchdog.refresh_interval
            )));
        }
        if self.watchdog.controller_refresh_interval <= 0.0 {
            return Err(ConfigError::Invalid(
                "watchdog.controller_refresh_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
