//! Application configuration management.
//!
//! This module handles loading the configuration, which holds
//! the identity endpoints, the API key and the storage backend choice.
//!
//! Configuration is stored at `~/.config/session-keeper/config.json` and
//! individual values can be overridden from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "session-keeper";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_SIGNUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signUp";
const DEFAULT_SIGNIN_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";

pub const ENV_API_KEY: &str = "SESSION_KEEPER_API_KEY";
pub const ENV_SIGNUP_URL: &str = "SESSION_KEEPER_SIGNUP_URL";
pub const ENV_SIGNIN_URL: &str = "SESSION_KEEPER_SIGNIN_URL";
pub const ENV_STORAGE: &str = "SESSION_KEEPER_STORAGE";

/// Where the persisted session lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub signup_url: String,
    pub signin_url: String,
    pub api_key: String,
    pub storage: StorageBackend,
    /// No timeout when absent; requests wait for the transport to give up.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signup_url: DEFAULT_SIGNUP_URL.to_string(),
            signin_url: DEFAULT_SIGNIN_URL.to_string(),
            api_key: String::new(),
            storage: StorageBackend::default(),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            debug!(?path, "Config loaded");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `SESSION_KEEPER_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(url) = lookup(ENV_SIGNUP_URL) {
            self.signup_url = url;
        }
        if let Some(url) = lookup(ENV_SIGNIN_URL) {
            self.signin_url = url;
        }
        if let Some(storage) = lookup(ENV_STORAGE) {
            self.storage = storage
                .parse()
                .with_context(|| format!("Invalid {}", ENV_STORAGE))?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

// ============================================================================
// Tests
// ============================================================================
