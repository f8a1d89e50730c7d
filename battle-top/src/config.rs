//! Server configuration
//!
//! Loaded from a TOML file; every section is optional and falls back to its
//! defaults. CLI flags and environment variables override individual values
//! in `main`.

use battle_core::{CredibilityWeights, FeatureFlags};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::auth::JwtValidator;
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP API to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Allow any origin (for local frontends)
    #[serde(default)]
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            permissive_cors: false,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("battle-top.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens (at least 32 characters)
    #[serde(default)]
    pub jwt_secret: String,

    /// Session lifetime
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,

    /// Use a built-in secret when none is configured
    #[serde(default)]
    pub dev_mode: bool,

    /// Key required by the bootstrap endpoint; bootstrap is refused without one
    #[serde(default)]
    pub init_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_secs: default_token_expiry(),
            dev_mode: false,
            init_key: None,
        }
    }
}

fn default_token_expiry() -> u64 {
    7 * 24 * 60 * 60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default)]
    pub credibility: CredibilityWeights,

    /// Stake used when a debate is opened without one
    #[serde(default = "default_debate_reward")]
    pub default_debate_reward: i64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            credibility: CredibilityWeights::default(),
            default_debate_reward: default_debate_reward(),
        }
    }
}

fn default_debate_reward() -> i64 {
    battle_core::debate::DEFAULT_DEBATE_REWARD
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| ApiError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load the file if it exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ApiError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ApiError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ApiError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| ApiError::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ApiError> {
        self.server
            .listen_addr
            .parse()
            .map_err(|e| ApiError::Config(format!("Invalid listen address {}: {}", self.server.listen_addr, e)))
    }

    /// Token validator for this configuration
    pub fn jwt_validator(&self) -> Result<JwtValidator, ApiError> {
        if self.auth.jwt_secret.is_empty() && self.auth.dev_mode {
            return Ok(JwtValidator::new_dev());
        }
        JwtValidator::new(self.auth.jwt_secret.clone(), self.auth.token_expiry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.auth.token_expiry_secs, 604_800);
        assert!(config.features.subscription);
        assert!(!config.features.wallet);
        assert_eq!(config.economy.default_debate_reward, 100);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("battle-top.db"));
    }

    #[test]
    fn test_jwt_validator_requires_secret() {
        let config = Config::default();
        assert!(config.jwt_validator().is_err());

        let mut config = Config::default();
        config.auth.dev_mode = true;
        assert!(config.jwt_validator().is_ok());
    }

    #[test]
    fn test_listen_addr_parse() {
        let mut config = Config::default();
        config.server.listen_addr = "127.0.0.1:8080".into();
        assert_eq!(config.listen_addr().unwrap().port(), 8080);

        config.server.listen_addr = "not an address".into();
        assert!(config.listen_addr().is_err());
    }
}
