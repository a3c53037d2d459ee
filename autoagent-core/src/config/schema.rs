//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for the autoagent client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection and protocol options
    #[serde(default)]
    pub client: ClientConfig,
    /// Local persistence
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How settings are mirrored to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// POST the settings record to `/api/settings`
    #[default]
    Settings,
    /// POST `{api_key, use_database, db_config}` to `/api/initialize` and
    /// keep the returned backend session
    Initialize,
}

/// Backend client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend origin, without the `/api` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub sync_mode: SyncMode,
    /// Import endpoint path (`/api/upload`, `/api/upload_knowledge` or
    /// `/api/import_knowledge` depending on the backend build)
    #[serde(default = "default_upload_endpoint")]
    pub upload_endpoint: String,
    /// Health endpoint path (`/api/health` or `/api/check_status`)
    #[serde(default = "default_health_endpoint")]
    pub health_endpoint: String,
    /// Keep reasoning steps and tool usage returned by the backend
    #[serde(default)]
    pub show_reasoning: bool,
    /// Per-request timeout; requests wait indefinitely when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_upload_endpoint() -> String {
    "/api/upload".to_string()
}

fn default_health_endpoint() -> String {
    "/api/health".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sync_mode: SyncMode::default(),
            upload_endpoint: default_upload_endpoint(),
            health_endpoint: default_health_endpoint(),
            show_reasoning: false,
            timeout_secs: None,
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one file per storage key
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

fn default_storage_dir() -> String {
    "~/.autoagent/storage".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.autoagent/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_serializes_lowercase() {
        let value = serde_json::to_value(SyncMode::Initialize).unwrap();
        assert_eq!(value, serde_json::json!("initialize"));
    }

    #[test]
    fn test_partial_client_section_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"client":{"show_reasoning":true}}"#).unwrap();
        assert!(config.client.show_reasoning);
        assert_eq!(config.client.base_url, "http://localhost:5000");
        assert_eq!(config.client.upload_endpoint, "/api/upload");
        assert_eq!(config.logging.format, "text");
    }
}
