//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub authorities: AuthoritiesConfig,
    #[serde(default)]
    pub initialization: InitConfig,
}

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:9304").
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Presence store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Base URLs and service credentials for the external authorities.
///
/// The tenant and session authorities live behind the same identity service
/// that issues credentials, so one base URL covers all three.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthoritiesConfig {
    /// Identity service: credential issuing, tenants, sessions.
    pub auth_url: String,
    /// Directory service: users with nested lines.
    pub directory_url: String,
    /// Device-telephony-state service.
    pub device_state_url: String,
    /// Service account identifier used to obtain credentials.
    pub service_id: String,
    /// Service account key used to obtain credentials.
    pub service_key: String,
}

/// Reconciliation startup behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitConfig {
    /// Requested credential lifetime for one reconciliation run, in seconds.
    #[serde(default = "default_credential_expiration_secs")]
    pub credential_expiration_secs: u64,
    /// Initial delay before retrying a failed reconciliation run, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Upper bound on the retry delay, in seconds. Setting this equal to
    /// `retry_delay_secs` yields a fixed retry interval.
    #[serde(default = "default_retry_max_delay_secs")]
    pub retry_max_delay_secs: u64,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            credential_expiration_secs: default_credential_expiration_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            retry_max_delay_secs: default_retry_max_delay_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9304".to_string()
}

fn default_credential_expiration_secs() -> u64 {
    120
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_retry_max_delay_secs() -> u64 {
    60
}
