//! Node-wide `Config` (§6): peer-class caps and the op-key renewal/expiry
//! and random-sync-interval windows every `ProtocolManager` is parameterized
//! by. Grounded on `original_source/service/globals.go`'s `DefaultConfig`
//! (peer caps) and `me/protocol_manager.go`'s `NewBaseProtocolManager` call
//! site (the four key/sync-interval fields); `original_source` doesn't carry
//! the constants file those four are defined in, so their defaults here are
//! a reasonable recreation rather than a literal transcription (noted in
//! `DESIGN.md`).
//!
//! This crate skips the generic multi-format `AuraConfig`/`ConfigLoader`
//! trait indirection the teacher uses for its many differently-shaped
//! per-component configs: there is exactly one `Config` type here, so a
//! concrete struct with its own `load_from_file`/`merge_with_env`/`validate`
//! inherent methods (the teacher's own `ExampleConfig` pattern) is the
//! simpler fit.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub max_peers: u32,
    pub max_important_peers: u32,
    pub max_member_peers: u32,
    pub max_random_peers: u32,
    pub renew_op_key_seconds: u64,
    pub expire_op_key_seconds: u64,
    pub max_sync_random_seconds: u32,
    pub min_sync_random_seconds: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            max_peers: 350,
            max_important_peers: 100,
            max_member_peers: 200,
            max_random_peers: 50,
            renew_op_key_seconds: 24 * 3600,
            expire_op_key_seconds: 3 * 24 * 3600,
            max_sync_random_seconds: 60,
            min_sync_random_seconds: 15,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("meshid")
}

impl Config {
    /// Loads from TOML, falling back to defaults entirely when the file is
    /// absent — the node should still boot on a brand-new machine.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.display().to_string(), source: e })?;
        toml::from_str(&content).map_err(|e| ConfigError::Toml { path: path.display().to_string(), source: e })
    }

    /// `MESHID_*` environment overrides, applied after the file so an
    /// operator can patch one field without rewriting the whole TOML.
    pub fn merge_with_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("MESHID_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        macro_rules! env_u32 {
            ($field:ident, $key:literal) => {
                if let Ok(v) = std::env::var($key) {
                    self.$field = v
                        .parse()
                        .map_err(|_| ConfigError::Env { key: $key.to_string(), message: "expected an integer".into() })?;
                }
            };
        }
        macro_rules! env_u64 {
            ($field:ident, $key:literal) => {
                if let Ok(v) = std::env::var($key) {
                    self.$field = v
                        .parse()
                        .map_err(|_| ConfigError::Env { key: $key.to_string(), message: "expected an integer".into() })?;
                }
            };
        }
        env_u32!(max_peers, "MESHID_MAX_PEERS");
        env_u32!(max_important_peers, "MESHID_MAX_IMPORTANT_PEERS");
        env_u32!(max_member_peers, "MESHID_MAX_MEMBER_PEERS");
        env_u32!(max_random_peers, "MESHID_MAX_RANDOM_PEERS");
        env_u64!(renew_op_key_seconds, "MESHID_RENEW_OP_KEY_SECONDS");
        env_u64!(expire_op_key_seconds, "MESHID_EXPIRE_OP_KEY_SECONDS");
        env_u32!(max_sync_random_seconds, "MESHID_MAX_SYNC_RANDOM_SECONDS");
        env_u32!(min_sync_random_seconds, "MESHID_MIN_SYNC_RANDOM_SECONDS");
        Ok(())
    }

    /// §8 bounds every `Config` instance must satisfy before a node starts.
    pub fn validate(&self) -> Result<()> {
        let sum = self.max_important_peers + self.max_member_peers + self.max_random_peers;
        if sum > self.max_peers {
            return Err(ConfigError::Invalid(format!(
                "peer class caps ({sum}) exceed max_peers ({})",
                self.max_peers
            )));
        }
        if self.min_sync_random_seconds == 0 || self.min_sync_random_seconds > self.max_sync_random_seconds {
            return Err(ConfigError::Invalid(
                "min_sync_random_seconds must be nonzero and <= max_sync_random_seconds".into(),
            ));
        }
        if self.expire_op_key_seconds <= self.renew_op_key_seconds {
            return Err(ConfigError::Invalid(
                "expire_op_key_seconds must be greater than renew_op_key_seconds".into(),
            ));
        }
        Ok(())
    }

    /// Load + env overlay + validate in one call, the shape `meshid-daemon`
    /// actually invokes at startup.
    pub fn resolve(path: &Path) -> Result<Self> {
        let mut config = Config::load_from_file(path)?;
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_from_file(Path::new("/nonexistent/meshid.toml")).unwrap();
        assert_eq!(config.max_peers, 350);
    }

    #[test]
    fn load_from_file_parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meshid.toml");
        std::fs::write(&path, "max_peers = 10\nmax_important_peers = 5\nmax_member_peers = 3\nmax_random_peers = 2\n")
            .unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.max_peers, 10);
        assert_eq!(config.max_important_peers, 5);
    }

    #[test]
    fn validate_rejects_peer_caps_that_overflow_max_peers() {
        let mut config = Config::default();
        config.max_peers = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_sync_window() {
        let mut config = Config::default();
        config.min_sync_random_seconds = 100;
        config.max_sync_random_seconds = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_expiry_not_after_renewal() {
        let mut config = Config::default();
        config.expire_op_key_seconds = config.renew_op_key_seconds;
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_with_env_overrides_max_peers() {
        std::env::set_var("MESHID_MAX_PEERS", "999");
        let mut config = Config::default();
        config.merge_with_env().unwrap();
        assert_eq!(config.max_peers, 999);
        std::env::remove_var("MESHID_MAX_PEERS");
    }
}
