//! Configuration loading and management
//!
//! Layers, lowest to highest: built-in defaults, `config.json`, short env
//! aliases, then `AUTOAGENT__SECTION__FIELD` path overrides.

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILE: &str = "config.json";

/// Prefix for path-style overrides, e.g. `AUTOAGENT__CLIENT__BASE_URL`
const ENV_PREFIX: &str = "AUTOAGENT__";

/// Short env names and the field each one sets
const ENV_ALIASES: [(&str, &[&str]); 3] = [
    ("AUTOAGENT_BASE_URL", &["client", "base_url"]),
    ("AUTOAGENT_STORAGE_DIR", &["storage", "dir"]),
    ("LOG_LEVEL", &["logging", "level"]),
];

/// One env-supplied field value
#[derive(Debug, Clone, PartialEq)]
struct Override {
    path: Vec<String>,
    value: Value,
}

/// Reads and writes `<config_dir>/config.json`
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader for `~/.autoagent`
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".autoagent"))
            .unwrap_or_else(|| PathBuf::from(".autoagent"));

        Self { config_dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load the configuration, applying overrides from the process environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(std::env::vars())
    }

    fn load_with_env<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layered = serde_json::to_value(Config::default())?;

        let path = self.config_path();
        if path.exists() {
            let file: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)
                .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
            overlay(&mut layered, file);
            debug!("Read {}", path.display());
        }

        for item in collect_overrides(vars) {
            debug!("Env override for {}", item.path.join("."));
            assign(&mut layered, &item.path, item.value);
        }

        let config: Config = serde_json::from_value(layered)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Validate, then write the configuration as pretty JSON
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        validate_config(config)?;
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::write(self.config_path(), serde_json::to_string_pretty(config)?)?;
        Ok(())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Aliases first so path overrides win when both name the same field
fn collect_overrides<I>(vars: I) -> Vec<Override>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut aliases = Vec::new();
    let mut paths = Vec::new();

    for (key, raw) in vars {
        if let Some((_, path)) = ENV_ALIASES.iter().find(|(name, _)| *name == key) {
            aliases.push(Override {
                path: path.iter().map(ToString::to_string).collect(),
                value: Value::String(raw),
            });
        } else if let Some(suffix) = key.strip_prefix(ENV_PREFIX) {
            let path: Vec<String> = suffix
                .split("__")
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
            if !path.is_empty() {
                paths.push(Override {
                    path,
                    value: typed_env_value(&raw),
                });
            }
        }
    }

    aliases.extend(paths);
    aliases
}

/// Interpret an env string as JSON when it parses, otherwise as a string
fn typed_env_value(raw: &str) -> Value {
    match raw.trim() {
        t if t.eq_ignore_ascii_case("true") => Value::Bool(true),
        t if t.eq_ignore_ascii_case("false") => Value::Bool(false),
        t => serde_json::from_str(t).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

/// Deep-merge `top` into `base`; objects merge, everything else replaces
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Set the field at `path`, creating intermediate objects as needed
fn assign(root: &mut Value, path: &[String], value: Value) {
    let Some((field, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(field.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncMode;
    use serde_json::json;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load_with_env(Vec::new()).unwrap();

        assert_eq!(config.client.base_url, "http://localhost:5000");
        assert_eq!(config.client.sync_mode, SyncMode::Settings);
        assert!(config.client.timeout_secs.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path().join("fresh"));

        let mut config = Config::default();
        config.client.base_url = "http://agent.internal:8080".to_string();
        config.client.sync_mode = SyncMode::Initialize;

        loader.save(&config).unwrap();
        let loaded = loader.load_with_env(Vec::new()).unwrap();

        assert_eq!(loaded.client.base_url, "http://agent.internal:8080");
        assert_eq!(loaded.client.sync_mode, SyncMode::Initialize);
    }

    #[test]
    fn test_save_refuses_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.client.base_url = String::new();

        assert!(loader.save(&config).is_err());
        assert!(!temp_dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            r#"{"client":{"show_reasoning":true}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap();
        assert!(config.client.show_reasoning);
        assert_eq!(config.client.upload_endpoint, "/api/upload");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        let err = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap_err();
        assert!(matches!(err, crate::Error::Config(ref m) if m.contains(CONFIG_FILE)));
    }

    #[test]
    fn test_alias_env_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader
            .load_with_env(env(&[
                ("AUTOAGENT_BASE_URL", "https://agent.example.com"),
                ("LOG_LEVEL", "debug"),
                ("UNRELATED", "ignored"),
            ]))
            .unwrap();

        assert_eq!(config.client.base_url, "https://agent.example.com");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_path_env_overrides_are_typed() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader
            .load_with_env(env(&[
                ("AUTOAGENT__CLIENT__SYNC_MODE", "initialize"),
                ("AUTOAGENT__CLIENT__SHOW_REASONING", "TRUE"),
                ("AUTOAGENT__CLIENT__TIMEOUT_SECS", "30"),
                ("AUTOAGENT__CLIENT__UPLOAD_ENDPOINT", "/api/import_knowledge"),
            ]))
            .unwrap();

        assert_eq!(config.client.sync_mode, SyncMode::Initialize);
        assert!(config.client.show_reasoning);
        assert_eq!(config.client.timeout_secs, Some(30));
        assert_eq!(config.client.upload_endpoint, "/api/import_knowledge");
    }

    #[test]
    fn test_path_override_beats_alias_and_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            r#"{"client":{"base_url":"http://file:5000"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(env(&[
                ("AUTOAGENT__CLIENT__BASE_URL", "http://path:5000"),
                ("AUTOAGENT_BASE_URL", "http://alias:5000"),
            ]))
            .unwrap();
        assert_eq!(config.client.base_url, "http://path:5000");
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(env(&[("AUTOAGENT__CLIENT__BASE_URL", "localhost:5000")]))
            .unwrap_err();
        assert!(err.to_string().contains("client.base_url"));
    }

    #[test]
    fn test_assign_creates_missing_objects() {
        let mut root = json!({"a": 1});
        let path = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assign(&mut root, &path, Value::Bool(true));
        assert_eq!(root, json!({"a": {"b": {"c": true}}}));
    }

    #[test]
    fn test_overlay_merges_nested_objects() {
        let mut base = json!({"client": {"base_url": "a", "show_reasoning": false}});
        overlay(&mut base, json!({"client": {"base_url": "b"}, "extra": 1}));
        assert_eq!(
            base,
            json!({"client": {"base_url": "b", "show_reasoning": false}, "extra": 1})
        );
    }
}
