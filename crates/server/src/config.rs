use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: String,
    /// Lifetime of a login session, in hours.
    pub session_ttl_hours: i64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("SERVER_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingVar("SERVER_DATABASE_URL"))?;

        let listen_addr =
            env::var("SERVER_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidVar("SESSION_TTL_HOURS"))?,
            Err(_) => 24 * 30,
        };

        Ok(Self {
            database_url,
            listen_addr,
            session_ttl_hours,
        })
    }
}
