//! User settings: API key and optional database connection
//!
//! The record is stored locally as a single camelCase JSON blob and
//! mirrored to the backend by the client crate.

pub mod form;
pub mod model;

pub use form::SettingsForm;
pub use model::{DatabaseSettings, Settings};

use crate::storage::{load_json, save_json, Storage, SETTINGS_KEY};

/// Read settings from storage, defaulting any missing field
pub fn load_settings(storage: &dyn Storage) -> crate::Result<Settings> {
    let settings: Settings = load_json(storage, SETTINGS_KEY)?.unwrap_or_default();
    Ok(settings.normalized())
}

/// Replace the stored settings record
pub fn store_settings(storage: &dyn Storage, settings: &Settings) -> crate::Result<()> {
    save_json(storage, SETTINGS_KEY, settings)?;
    tracing::debug!("Settings written to local storage");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_load_without_stored_record_uses_defaults() {
        let storage = MemoryStorage::new();
        let settings = load_settings(&storage).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_partial_record_gets_structural_defaults() {
        let storage = MemoryStorage::new();
        storage
            .set(SETTINGS_KEY, r#"{"apiKey":"sk-1","database":{"host":""}}"#)
            .unwrap();

        let settings = load_settings(&storage).unwrap();
        assert_eq!(settings.api_key, "sk-1");
        assert!(!settings.use_database);
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 3306);
        assert_eq!(settings.database.user, "root");
        assert_eq!(settings.database.name, "llm_agent");
    }

    #[test]
    fn test_store_then_load() {
        let storage = MemoryStorage::new();
        let mut settings = Settings::default();
        settings.api_key = "sk-test".to_string();
        settings.use_database = true;
        settings.database.password = "secret".to_string();

        store_settings(&storage, &settings).unwrap();
        assert_eq!(load_settings(&storage).unwrap(), settings);
    }
}
