//! Server configuration loaded from environment variables.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

/// Errors in environment-provided configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

/// Server configuration.
///
/// | Env Var        | Default        |
/// |----------------|----------------|
/// | `HOST`         | `0.0.0.0`      |
/// | `PORT`         | `3000`         |
/// | `DATA_PATH`    | `data/db.json` |
/// | `CORS_ORIGINS` | `*`            |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Backing file of the ticket store.
    pub data_path: PathBuf,
    pub cors_origins: CorsOrigins,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let host = host.parse().map_err(|_| ConfigError::Invalid {
            var: "HOST",
            expected: "an IP address",
            value: host.clone(),
        })?;

        let port = lookup("PORT").unwrap_or_else(|| "3000".into());
        let port = port.parse().map_err(|_| ConfigError::Invalid {
            var: "PORT",
            expected: "a port number",
            value: port.clone(),
        })?;

        let data_path = lookup("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data").join("db.json"));

        let cors_origins = match lookup("CORS_ORIGINS") {
            None => CorsOrigins::Any,
            Some(raw) if raw.trim() == "*" => CorsOrigins::Any,
            Some(raw) => CorsOrigins::List(
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        };

        Ok(Self {
            host,
            port,
            data_path,
            cors_origins,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
