//! Bridge configuration.
//!
//! Defaults match what the companion server expects, so most hosts never need
//! a config file. When one is present it is plain TOML:
//!
//! ```toml
//! local_addr = "127.0.0.1:7948"
//! server_addr = "127.0.0.1:7947"
//! recv_timeout_ms = 2000
//! queue_capacity = 64
//! version = 0x0800
//! ```

use crate::error::ConfigError;
use crate::protocol::{LOCAL_PORT, PEER_PORT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Address our socket binds to. State reports arrive here.
    pub local_addr: SocketAddr,
    /// Address of the companion server's control socket.
    pub server_addr: SocketAddr,
    /// Receive timeout; bounds how long `read`/`acquire` may block.
    pub recv_timeout_ms: u64,
    /// Buffered event capacity used by [`DeviceManager`](crate::manager::DeviceManager).
    pub queue_capacity: usize,
    /// Legacy API version the host speaks (affects the reported device type).
    pub version: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            local_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, LOCAL_PORT)),
            server_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, PEER_PORT)),
            recv_timeout_ms: 2000,
            queue_capacity: 64,
            version: 0x0800,
        }
    }
}

impl BridgeConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_ports() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.local_addr.port(), 7948);
        assert_eq!(cfg.server_addr.port(), 7947);
        assert_eq!(cfg.recv_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = BridgeConfig::from_toml_str("recv_timeout_ms = 50\n").unwrap();
        assert_eq!(cfg.recv_timeout_ms, 50);
        assert_eq!(cfg.queue_capacity, 64);
        assert_eq!(cfg.server_addr, BridgeConfig::default().server_addr);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = BridgeConfig::from_toml_str("recv_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("padlink-cfg-{}", std::process::id()));
        let path = dir.join("bridge.toml");
        let cfg = BridgeConfig {
            recv_timeout_ms: 125,
            queue_capacity: 8,
            ..BridgeConfig::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap(), cfg);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_default() {
        let path = std::env::temp_dir().join("padlink-does-not-exist.toml");
        assert_eq!(BridgeConfig::load(path).unwrap(), BridgeConfig::default());
    }
}
