//! Raw settings input as entered by the user

use super::model::{DatabaseSettings, Settings, DEFAULT_DB_PORT};

/// Unvalidated settings input; every field is the text the user typed
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub api_key: String,
    pub use_database: bool,
    pub db_host: String,
    pub db_port: String,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
}

impl SettingsForm {
    /// Pre-fill a form from an existing record
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            use_database: settings.use_database,
            db_host: settings.database.host.clone(),
            db_port: settings.database.port.to_string(),
            db_user: settings.database.user.clone(),
            db_password: settings.database.password.clone(),
            db_name: settings.database.name.clone(),
        }
    }

    /// Build a settings record
    ///
    /// A blank API key is a validation error. An unparsable port falls back
    /// to the default port, like every other blank database field.
    pub fn into_settings(self) -> crate::Result<Settings> {
        if self.api_key.trim().is_empty() {
            return Err(crate::Error::Validation("API key must not be empty".to_string()));
        }

        let port = self.db_port.trim().parse::<u16>().unwrap_or(DEFAULT_DB_PORT);
        let settings = Settings {
            api_key: self.api_key,
            use_database: self.use_database,
            database: DatabaseSettings {
                host: self.db_host,
                port,
                user: self.db_user,
                password: self.db_password,
                name: self.db_name,
            },
        };
        Ok(settings.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_is_rejected() {
        let form = SettingsForm {
            api_key: "   ".to_string(),
            ..Default::default()
        };
        let err = form.into_settings().unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
    }

    #[test]
    fn test_blank_fields_get_defaults() {
        let form = SettingsForm {
            api_key: " sk-key ".to_string(),
            use_database: true,
            db_port: "not a port".to_string(),
            ..Default::default()
        };
        let settings = form.into_settings().unwrap();
        assert_eq!(settings.api_key, "sk-key");
        assert!(settings.use_database);
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 3306);
        assert_eq!(settings.database.name, "llm_agent");
    }

    #[test]
    fn test_from_settings_round_trip() {
        let mut settings = Settings::default();
        settings.api_key = "sk".to_string();
        settings.database.port = 3307;
        let rebuilt = SettingsForm::from_settings(&settings).into_settings().unwrap();
        assert_eq!(rebuilt, settings);
    }
}
