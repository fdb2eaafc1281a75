use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides. Nested keys are separated by `__`,
/// e.g. `SORTVAULT_SCHEDULER__CONCURRENCY=8`.
pub const ENV_PREFIX: &str = "SORTVAULT_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_prefix(path, ENV_PREFIX)
}

fn load_config_with_prefix(path: &Path, prefix: &str) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(prefix).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placer::ConflictStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[scheduler]
concurrency = 2

[scheduler.retry]
max_attempts = 5

[placer]
default_strategy = "skip"

[oracle]
endpoint = "http://localhost:8000/classify"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.scheduler.concurrency, 2);
        assert_eq!(config.scheduler.retry.max_attempts, 5);
        assert_eq!(config.scheduler.retry.base_delay_ms, 1000);
        assert_eq!(config.placer.default_strategy, ConflictStrategy::Skip);
        assert_eq!(
            config.oracle.unwrap().endpoint,
            "http://localhost:8000/classify"
        );
    }

    #[test]
    fn test_load_config_from_str_empty() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.scheduler.concurrency, 5);
        assert!(config.oracle.is_none());
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let result = load_config_from_str("[scheduler]\nconcurrency = \"lots\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[cache]
path = "/var/lib/sortvault/cache.db"

[journal]
path = "/var/lib/sortvault/journal.json"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(
            config.cache.path.unwrap().to_str(),
            Some("/var/lib/sortvault/cache.db")
        );
        assert!(config.journal.path.is_some());
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[scheduler]\nconcurrency = 2\n").unwrap();

        // A prefix no other test uses, so parallel tests cannot interfere.
        std::env::set_var("SORTVAULT_LOADER_TEST_SCHEDULER__CONCURRENCY", "9");
        std::env::set_var("SORTVAULT_LOADER_TEST_SCHEDULER__RETRY__MAX_ATTEMPTS", "4");
        let config =
            load_config_with_prefix(temp_file.path(), "SORTVAULT_LOADER_TEST_").unwrap();
        std::env::remove_var("SORTVAULT_LOADER_TEST_SCHEDULER__CONCURRENCY");
        std::env::remove_var("SORTVAULT_LOADER_TEST_SCHEDULER__RETRY__MAX_ATTEMPTS");

        assert_eq!(config.scheduler.concurrency, 9);
        assert_eq!(config.scheduler.retry.max_attempts, 4);
    }
}
