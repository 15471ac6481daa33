use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::blacklist::BlacklistConfig;
use crate::dos::{ClientTableConfig, FloodConfig};
use crate::error::{GuardError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: FloodConfig,

    #[serde(default)]
    pub blacklist: BlacklistConfig,

    #[serde(default)]
    pub clients: ClientTableConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply env overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from default locations or fall back to defaults
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/apguard/config.toml"),
            PathBuf::from("apguard.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GuardError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GuardError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Apply environment variable overrides.
    ///
    /// Supported variables:
    /// - APGUARD_DISASSOC_THRESHOLD, APGUARD_AUTH_THRESHOLD, APGUARD_PACKET_THRESHOLD
    /// - APGUARD_WINDOW_MS
    /// - APGUARD_BLACKLIST_DURATION_MS, APGUARD_BLACKLIST_CAPACITY
    /// - APGUARD_CLIENT_CAPACITY
    /// - APGUARD_BIND, APGUARD_PORT
    /// - APGUARD_LOG_LEVEL
    pub fn apply_env_overrides(&mut self) {
        override_parsed("APGUARD_DISASSOC_THRESHOLD", &mut self.detection.disassoc_threshold);
        override_parsed("APGUARD_AUTH_THRESHOLD", &mut self.detection.auth_threshold);
        override_parsed("APGUARD_PACKET_THRESHOLD", &mut self.detection.packet_threshold);
        override_parsed("APGUARD_WINDOW_MS", &mut self.detection.window_ms);
        override_parsed("APGUARD_BLACKLIST_DURATION_MS", &mut self.blacklist.duration_ms);
        override_parsed("APGUARD_BLACKLIST_CAPACITY", &mut self.blacklist.capacity);
        override_parsed("APGUARD_CLIENT_CAPACITY", &mut self.clients.capacity);
        override_parsed("APGUARD_BIND", &mut self.server.bind);
        override_parsed("APGUARD_PORT", &mut self.server.port);

        if let Ok(v) = std::env::var("APGUARD_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Reject settings the tables cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.detection.window_ms == 0 {
            return Err(GuardError::Config("detection.window_ms must be > 0".into()));
        }
        if self.blacklist.capacity == 0 {
            return Err(GuardError::Config("blacklist.capacity must be > 0".into()));
        }
        if self.clients.capacity == 0 {
            return Err(GuardError::Config("clients.capacity must be > 0".into()));
        }
        if self.server.recv_buffer < 2 {
            return Err(GuardError::Config("server.recv_buffer must be >= 2".into()));
        }
        Ok(())
    }
}

fn override_parsed<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var) {
        if let Ok(parsed) = v.parse() {
            *target = parsed;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// TCP port for client messages
    #[serde(default = "default_port")]
    pub port: u16,

    /// Receive buffer size; one byte is reserved, so at most
    /// `recv_buffer - 1` bytes of a message are read
    #[serde(default = "default_recv_buffer")]
    pub recv_buffer: usize,

    /// Per-connection receive/send timeout (milliseconds)
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            recv_buffer: default_recv_buffer(),
            io_timeout_ms: default_io_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Log a security report periodically
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between reports
    #[serde(default = "default_status_interval")]
    pub interval_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_status_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3333
}

fn default_recv_buffer() -> usize {
    128
}

fn default_io_timeout() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_status_interval() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.detection.disassoc_threshold, 5);
        assert_eq!(config.detection.auth_threshold, 8);
        assert_eq!(config.detection.packet_threshold, 30);
        assert_eq!(config.detection.window_ms, 1000);
        assert_eq!(config.blacklist.duration_ms, 300_000);
        assert_eq!(config.blacklist.capacity, 10);
        assert_eq!(config.clients.capacity, 20);
        assert_eq!(config.server.port, 3333);
        assert_eq!(config.server.recv_buffer, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_str(
            r#"
            [detection]
            auth_threshold = 3

            [server]
            port = 4444
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.auth_threshold, 3);
        assert_eq!(config.detection.disassoc_threshold, 5);
        assert_eq!(config.server.port, 4444);
        assert_eq!(config.blacklist.capacity, 10);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = Config::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.listen_addr(), config.server.listen_addr());
        assert_eq!(parsed.blacklist.duration_ms, config.blacklist.duration_ms);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.blacklist.capacity = 0;
        assert!(matches!(config.validate(), Err(GuardError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_str("[detection\nauth = ").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[blacklist]\nduration_ms = 60000\ncapacity = 4").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.blacklist.duration_ms, 60_000);
        assert_eq!(config.blacklist.capacity, 4);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/apguard.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
