//! Configuration schema.
//!
//! All recognised keys and their defaults live in the types below. A file is
//! optional; environment variables override whatever it sets. Validation runs
//! once, before any vault is built.
//!
//! ```toml
//! log_level = "info"
//!
//! [security]
//! master_key = "<base64>"
//!
//! [audit]
//! sqlite_path = "audit.db"
//! jsonl_path = "audit.jsonl"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

pub const ENV_MASTER_KEY: &str = "CREDVAULT_MASTER_KEY";
pub const ENV_LOG_LEVEL: &str = "CREDVAULT_LOG_LEVEL";
pub const ENV_AUDIT_SQLITE_PATH: &str = "CREDVAULT_AUDIT_SQLITE_PATH";

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            security: SecurityConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// Encryption settings.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Base64 master key. Required; never defaulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key: Option<String>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("master_key", &self.master_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where audit records go. With neither path set, the CLI keeps them in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonl_path: Option<PathBuf>,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, VaultError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, VaultError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    VaultError::Configuration(format!("cannot read {}: {}", path.display(), e))
                })?;
                tracing::debug!(path = %path.display(), "loaded config file");
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_MASTER_KEY) {
            self.security.master_key = Some(key);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(path) = get(ENV_AUDIT_SQLITE_PATH) {
            self.audit.sqlite_path = Some(PathBuf::from(path));
        }
    }

    /// Check that everything the vault needs is present.
    ///
    /// Only presence is checked here; decoding and length are enforced by
    /// `CredentialVault::from_config`.
    pub fn validate(&self) -> Result<(), VaultError> {
        match self.security.master_key.as_deref().map(str::trim) {
            None | Some("") => Err(VaultError::Configuration(
                "security.master_key is required".into(),
            )),
            Some(_) => Ok(()),
        }
    }
}
