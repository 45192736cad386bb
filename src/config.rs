use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a production Postgres instance")]
    MissingDatabaseUrl,
    #[error("DATABASE_MAX_CONNECTIONS must be a positive integer, got {0:?}")]
    InvalidMaxConnections(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub environment: String,
}

impl Config {
    /// Reads settings from the process environment, after loading `.env` if
    /// one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidMaxConnections(raw))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
            environment: get_environment_from(lookup("APP_ENV")),
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}

fn get_environment_from(value: Option<String>) -> String {
    value
        .map(|env| env.trim().to_lowercase())
        .filter(|env| !env.is_empty())
        .unwrap_or_else(|| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/edu")]))
            .expect("config");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn bad_pool_size_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/edu"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxConnections(value) if value == "0"));
    }

    #[test]
    fn production_environment_is_detected() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/edu"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("APP_ENV", "Prod"),
        ]))
        .expect("config");
        assert_eq!(config.max_connections, 12);
        assert!(config.is_production());
    }
}
