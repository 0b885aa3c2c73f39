//! Client configuration.
//!
//! Stored in `.tessera/config.yaml`:
//! - `api`: service location, token and request timeout
//! - `store`: controller behaviour
//! - `view_flags`: which issue actions the views offer

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};

pub const CONFIG_DIR: &str = ".tessera";
pub const TOKEN_ENV_VAR: &str = "TESSERA_API_TOKEN";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub view_flags: ViewFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Run mutations on the same issue one after another instead of letting
    /// them interleave.
    #[serde(default)]
    pub serialize_mutations: bool,
}

fn default_true() -> bool {
    true
}

/// Issue actions a project view exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFlags {
    #[serde(default = "default_true")]
    pub enable_quick_add: bool,
    #[serde(default = "default_true")]
    pub enable_issue_creation: bool,
    #[serde(default = "default_true")]
    pub enable_inline_editing: bool,
}

impl Default for ViewFlags {
    fn default() -> Self {
        ViewFlags {
            enable_quick_add: true,
            enable_issue_creation: true,
            enable_inline_editing: true,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join("config.yaml")
    }

    /// Load from the default location, or defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api.timeout_secs == 0 {
            return Err(TesseraError::Config(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.api.base_url)?;
        Ok(())
    }

    /// API token from the environment, falling back to the config file.
    pub fn api_token(&self) -> Option<String> {
        if let Ok(token) = env::var(TOKEN_ENV_VAR)
            && !token.is_empty()
        {
            return Some(token);
        }

        self.api.token.clone().filter(|t| !t.is_empty())
    }

    pub fn set_api_token(&mut self, token: String) {
        self.api.token = Some(token);
    }
}
