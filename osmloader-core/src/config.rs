//! MongoDB connection configuration for the loader.
//!
//! The configuration is assembled once at construction time and is
//! immutable afterwards; the connection URI is a pure derivation of the
//! host and port fields, so it can never go stale.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the MongoDB connection behind a loader instance.
///
/// # Example
/// ```rust
/// use osmloader_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string(), 27017, "osm".to_string());
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.connection_uri(), "mongodb://localhost:27017");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host address
    pub host: String,
    /// Database port number
    pub port: u16,
    /// Logical database the parsed elements are written into
    pub database: String,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Server selection timeout duration
    pub server_selection_timeout: Duration,
}

impl ConnectionConfig {
    /// Creates a new connection config with default timeouts.
    pub fn new(host: String, port: u16, database: String) -> Self {
        Self {
            host,
            port,
            database,
            connect_timeout: Duration::from_secs(30),
            server_selection_timeout: Duration::from_secs(30),
        }
    }

    /// Builder method to set the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the server selection timeout.
    #[must_use]
    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    /// Derives the MongoDB connection URI from host and port.
    ///
    /// Always consistent with the configured fields; there is no way to
    /// set the URI independently.
    pub fn connection_uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }

    /// Validates connection configuration parameters.
    ///
    /// Validation happens eagerly at loader construction so that bad
    /// parameters fail fast with a descriptive error instead of
    /// surfacing on first use.
    ///
    /// # Errors
    /// Returns error if any configuration value is invalid
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::error::OsmLoaderError::configuration(
                "host cannot be empty",
            ));
        }

        if self.host.contains(char::is_whitespace) {
            return Err(crate::error::OsmLoaderError::configuration(
                "host cannot contain whitespace",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::OsmLoaderError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.database.is_empty() {
            return Err(crate::error::OsmLoaderError::configuration(
                "database name cannot be empty",
            ));
        }

        // MongoDB forbids these characters in database names
        if self
            .database
            .contains(|c: char| c.is_whitespace() || matches!(c, '/' | '\\' | '.' | '"' | '$'))
        {
            return Err(crate::error::OsmLoaderError::configuration(
                "database name contains invalid characters",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::OsmLoaderError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.server_selection_timeout.is_zero() {
            return Err(crate::error::OsmLoaderError::configuration(
                "server_selection_timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}:{}/{})",
            self.host, self.port, self.database
        )
        // Credentials are never part of this config and never printed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConnectionConfig {
        ConnectionConfig::new("localhost".to_string(), 27017, "osm".to_string())
    }

    #[test]
    fn test_connection_uri_derivation() {
        assert_eq!(sample().connection_uri(), "mongodb://localhost:27017");

        let config = ConnectionConfig::new("db.example.com".to_string(), 37017, "map".to_string());
        assert_eq!(config.connection_uri(), "mongodb://db.example.com:37017");
    }

    #[test]
    fn test_validation_accepts_sane_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_host() {
        let config = ConnectionConfig {
            host: String::new(),
            ..sample()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let config = ConnectionConfig { port: 0, ..sample() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_database_names() {
        for name in ["", "has space", "a/b", "a.b", "dollar$"] {
            let config = ConnectionConfig {
                database: name.to_string(),
                ..sample()
            };
            assert!(config.validate().is_err(), "expected rejection for {name:?}");
        }
    }

    #[test]
    fn test_validation_rejects_zero_timeouts() {
        let config = sample().with_connect_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = sample().with_server_selection_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_shows_target_without_credentials() {
        let display = format!("{}", sample());
        assert!(display.contains("localhost"));
        assert!(display.contains("27017"));
        assert!(display.contains("osm"));
    }
}
