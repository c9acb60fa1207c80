//! Optional TOML configuration for the server and client binaries.
//!
//! Every key is optional; command-line values win over the file, and the
//! file wins over the built-in defaults.

use std::path::Path;

use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Extra `tracing` filter directive, e.g. `huddle_core=debug`.
    pub log: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub log: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log: None,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load(path)
    }
}

fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let server: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(server, ServerConfig::default());
        let client: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(client.host, "localhost");
        assert_eq!(client.port, 5555);
    }

    #[test]
    fn partial_client_config() {
        let client: ClientConfig = toml::from_str("host = \"chat.example.org\"").unwrap();
        assert_eq!(client.host, "chat.example.org");
        assert_eq!(client.port, DEFAULT_PORT);
    }

    #[test]
    fn server_config_with_log() {
        let server: ServerConfig =
            toml::from_str("port = 7000\nlog = \"huddle_core=debug\"").unwrap();
        assert_eq!(server.port, 7000);
        assert_eq!(server.log.as_deref(), Some("huddle_core=debug"));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        assert!(toml::from_str::<ServerConfig>("port = 70000").is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ServerConfig::load(Path::new("/nonexistent/huddle.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
