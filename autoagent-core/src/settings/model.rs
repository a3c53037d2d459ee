use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_USER: &str = "root";
pub const DEFAULT_DB_NAME: &str = "llm_agent";

/// Settings record as persisted locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub use_database: bool,
    /// Only consulted when `use_database` is set
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl Settings {
    /// Whether chat and import are allowed
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Fill blank database fields with their defaults
    pub fn normalized(mut self) -> Self {
        self.api_key = self.api_key.trim().to_string();
        self.database = self.database.normalized();
        self
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let count = self.api_key.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.api_key.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

/// Database connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_host() -> String {
    DEFAULT_DB_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_DB_PORT
}

fn default_user() -> String {
    DEFAULT_DB_USER.to_string()
}

fn default_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: String::new(),
            name: default_name(),
        }
    }
}

impl DatabaseSettings {
    /// Replace blank fields with defaults
    pub fn normalized(self) -> Self {
        fn or_default(value: String, default: &str) -> String {
            let value = value.trim();
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        }

        Self {
            host: or_default(self.host, DEFAULT_DB_HOST),
            port: if self.port == 0 { DEFAULT_DB_PORT } else { self.port },
            user: or_default(self.user, DEFAULT_DB_USER),
            password: self.password,
            name: or_default(self.name, DEFAULT_DB_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_wire_names() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert!(value.get("apiKey").is_some());
        assert!(value.get("useDatabase").is_some());
        assert_eq!(value["database"]["port"], 3306);
    }

    #[test]
    fn test_normalize_blank_database_fields() {
        let db = DatabaseSettings {
            host: "  ".to_string(),
            port: 0,
            user: String::new(),
            password: " keep ".to_string(),
            name: String::new(),
        }
        .normalized();

        assert_eq!(db.host, "localhost");
        assert_eq!(db.port, 3306);
        assert_eq!(db.user, "root");
        assert_eq!(db.password, " keep ");
        assert_eq!(db.name, "llm_agent");
    }

    #[test]
    fn test_masked_api_key() {
        let mut settings = Settings::default();
        settings.api_key = "sk-abcdef1234".to_string();
        assert_eq!(settings.masked_api_key(), "*********1234");
        settings.api_key = "abc".to_string();
        assert_eq!(settings.masked_api_key(), "***");
    }
}
