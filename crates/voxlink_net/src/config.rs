//! # Client Configuration
//!
//! Connection parameters, loaded once at startup from TOML or built in code.
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 15000
//! connect_timeout_ms = 5000
//! read_timeout_ms = 30000   # omit to block forever
//! player_name = "steve"
//! render_distance = 8
//! log_level = "info"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NetError, NetResult};

/// Default server port.
pub const DEFAULT_PORT: u16 = 15000;

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// How long to wait for the TCP handshake.
    pub connect_timeout_ms: u64,
    /// Read deadline for the receive loop.
    ///
    /// `None` blocks forever: a server that stops sending without closing
    /// the socket stalls the receive loop until `stop()` closes it.
    pub read_timeout_ms: Option<u64>,
    /// Name announced in client metadata.
    pub player_name: String,
    /// Render distance announced in client metadata, in chunks.
    pub render_distance: u8,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Name of the receive thread.
    pub thread_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 5_000,
            read_timeout_ms: None,
            player_name: "player".to_string(),
            render_distance: 8,
            log_level: "info".to_string(),
            thread_name: "voxlink-recv".to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a config for `host:port` with defaults elsewhere.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> NetResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| NetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> NetResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NetError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Checks that the config can be used to connect.
    pub fn validate(&self) -> NetResult<()> {
        if self.host.trim().is_empty() {
            return Err(NetError::InvalidConfig("host is empty".into()));
        }
        if self.port == 0 {
            return Err(NetError::InvalidConfig("port must be non-zero".into()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(NetError::InvalidConfig(
                "connect_timeout_ms must be non-zero".into(),
            ));
        }
        if self.read_timeout_ms == Some(0) {
            return Err(NetError::InvalidConfig(
                "read_timeout_ms must be non-zero when set".into(),
            ));
        }
        Ok(())
    }

    /// `host:port` as passed to the resolver.
    #[must_use]
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a duration.
    #[inline]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read deadline as a duration, if any.
    #[inline]
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr_string(), "127.0.0.1:15000");
        assert!(config.read_timeout().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            host = "play.example.net"
            read_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "play.example.net");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.render_distance, 8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ClientConfig::from_toml_str("port = 0"),
            Err(NetError::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("host = \"  \""),
            Err(NetError::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("port = \"not a number\""),
            Err(NetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("here.toml"));
    }
}
