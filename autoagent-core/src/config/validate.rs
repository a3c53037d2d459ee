//! Configuration validation rules.

use super::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.client.base_url.trim();
    if base_url.is_empty() {
        errors.push("client.base_url must not be empty".to_string());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push("client.base_url must start with http:// or https://".to_string());
    }
    if !config.client.upload_endpoint.starts_with('/') {
        errors.push("client.upload_endpoint must be an absolute path".to_string());
    }
    if !config.client.health_endpoint.starts_with('/') {
        errors.push("client.health_endpoint must be an absolute path".to_string());
    }
    if config.client.timeout_secs == Some(0) {
        errors.push("client.timeout_secs must be > 0 when set".to_string());
    }

    if config.storage.dir.trim().is_empty() {
        errors.push("storage.dir must not be empty".to_string());
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }
    let format = config.logging.format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push("logging.format must be text or json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.client.upload_endpoint = "api/upload".to_string();
        config.client.timeout_secs = Some(0);
        config.logging.format = "yaml".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("client.upload_endpoint"));
        assert!(err.contains("client.timeout_secs"));
        assert!(err.contains("logging.format"));
    }

    #[test]
    fn test_validate_level_is_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "INFO".to_string();
        validate_config(&config).unwrap();
    }
}
