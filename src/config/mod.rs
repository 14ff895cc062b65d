//! Configuration for an FNE peer session.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::types::PeerDetails;

/// Main peer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Peer identifier advertised to the master.
    pub peer_id: u32,

    /// Master endpoint.
    pub master_addr: SocketAddr,

    /// Authentication passphrase shared with the master.
    pub passphrase: String,

    /// Interval between maintenance ticks (login retry / ping).
    #[serde(default = "default_ping_time", with = "humantime_serde")]
    pub ping_time: Duration,

    /// Optional 32-byte preshared key enabling AES-256 datagram wrapping,
    /// hex-encoded in configuration files.
    #[serde(default)]
    pub preshared_key: Option<String>,

    /// Details advertised during the configuration phase.
    #[serde(default)]
    pub details: PeerDetails,
}

fn default_ping_time() -> Duration {
    Duration::from_secs(5)
}

impl PeerConfig {
    pub fn new(peer_id: u32, master_addr: SocketAddr, passphrase: impl Into<String>) -> Self {
        Self {
            peer_id,
            master_addr,
            passphrase: passphrase.into(),
            ping_time: default_ping_time(),
            preshared_key: None,
            details: PeerDetails::default(),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.peer_id == 0 {
            return Err(Error::InvalidConfig("peer id must be non-zero".into()));
        }

        if self.ping_time.is_zero() {
            return Err(Error::InvalidConfig("ping time must be non-zero".into()));
        }

        if let Some(key) = &self.preshared_key {
            if decode_hex_key(key).is_none() {
                return Err(Error::InvalidConfig(
                    "preshared key must be 64 hex characters (32 bytes)".into(),
                ));
            }
        }

        Ok(())
    }

    /// Decode the configured preshared key, if any.
    pub fn preshared_key_bytes(&self) -> Option<Zeroizing<[u8; 32]>> {
        self.preshared_key.as_deref().and_then(decode_hex_key)
    }
}

fn decode_hex_key(s: &str) -> Option<Zeroizing<[u8; 32]>> {
    let s = s.trim();
    if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut key = Zeroizing::new([0u8; 32]);
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PeerConfig {
        PeerConfig::new(9000, "127.0.0.1:62031".parse().unwrap(), "password")
    }

    #[test]
    fn test_validate_ok() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_peer_id() {
        let mut config = base_config();
        config.peer_id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preshared_key_decode() {
        let mut config = base_config();
        config.preshared_key = Some("00".repeat(32));
        assert!(config.validate().is_ok());
        let key = config.preshared_key_bytes().unwrap();
        assert_eq!(*key, [0u8; 32]);

        config.preshared_key = Some("not hex".into());
        assert!(config.validate().is_err());
        assert!(config.preshared_key_bytes().is_none());

        config.preshared_key = Some("ab".repeat(16));
        assert!(config.validate().is_err());
    }
}
