//! Server configuration.

use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, ServerError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable request logging.
    pub request_logging: bool,

    /// CORS allowed origins (empty = no CORS).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], nerloop_config::DEFAULT_PORT)),
            request_logging: true,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[server]` config section.
    pub fn from_section(section: &nerloop_config::ServerConfig) -> Result<Self> {
        let ip: IpAddr = section.bind.parse().map_err(|e| {
            ServerError::Config(format!("Invalid bind address '{}': {e}", section.bind))
        })?;
        Ok(Self {
            bind_address: SocketAddr::new(ip, section.port),
            request_logging: section.request_logging,
            cors_origins: section.cors_origins.clone(),
        })
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set CORS allowed origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.port(), 8080);
        assert!(config.bind_address.ip().is_loopback());
        assert!(config.request_logging);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_from_section() {
        let section = nerloop_config::ServerConfig {
            port: 9000,
            bind: "0.0.0.0".to_string(),
            request_logging: false,
            cors_origins: vec!["http://localhost:3000".to_string()],
        };
        let config = ServerConfig::from_section(&section).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:9000");
        assert!(!config.request_logging);
        assert_eq!(config.cors_origins.len(), 1);
    }

    #[test]
    fn test_from_section_rejects_bad_bind() {
        let section = nerloop_config::ServerConfig {
            bind: "not an ip".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ServerConfig::from_section(&section),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::new()
            .with_bind_address("127.0.0.1:0".parse().unwrap())
            .with_request_logging(false)
            .with_cors_origins(vec!["*".to_string()]);
        assert_eq!(config.bind_address.port(), 0);
        assert!(!config.request_logging);
        assert_eq!(config.cors_origins, vec!["*"]);
    }
}
