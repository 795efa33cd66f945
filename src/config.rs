//! Application configuration.
//!
//! Layering, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `<data_dir>/config.json`
//! 3. `AGENT_ACTIONS_*` environment variables
//!
//! Command-line flags are applied on top by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::executor::{ExecutorConfig, DEFAULT_ACTION_TIMEOUT_SECS};
use crate::workspace::{default_package_managers, DEFAULT_SHELL};

/// Overrides the data directory (default `~/.agent-actions`)
pub const HOME_ENV: &str = "AGENT_ACTIONS_HOME";
pub const HOST_URL_ENV: &str = "AGENT_ACTIONS_HOST_URL";
pub const HOST_TOKEN_ENV: &str = "AGENT_ACTIONS_HOST_TOKEN";
pub const ACTION_TIMEOUT_ENV: &str = "AGENT_ACTIONS_ACTION_TIMEOUT_SECS";
pub const ALLOW_NOOP_EDITS_ENV: &str = "AGENT_ACTIONS_ALLOW_NOOP_EDITS";

const DATA_DIR_NAME: &str = ".agent-actions";
const CONFIG_FILE_NAME: &str = "config.json";

/// Settings stored in config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Per-action timeout; 0 disables it
    pub action_timeout_secs: u64,
    pub allow_noop_edits: bool,
    /// Shell used to run commands (`<shell> -c <command>`)
    pub shell: String,
    /// Language → package-manager command prefix
    pub package_managers: BTreeMap<String, Vec<String>>,
    /// Remote workspace host; local workspace when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            action_timeout_secs: DEFAULT_ACTION_TIMEOUT_SECS,
            allow_noop_edits: false,
            shell: DEFAULT_SHELL.to_string(),
            package_managers: default_package_managers(),
            host_url: None,
            host_token: None,
        }
    }
}

impl AppConfig {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            action_timeout: (self.action_timeout_secs > 0)
                .then(|| Duration::from_secs(self.action_timeout_secs)),
            allow_noop_edits: self.allow_noop_edits,
        }
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(HOST_URL_ENV).filter(|v| !v.is_empty()) {
            debug!("Using host URL from {}", HOST_URL_ENV);
            self.host_url = Some(url);
        }
        if let Some(token) = lookup(HOST_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.host_token = Some(token);
        }
        if let Some(raw) = lookup(ACTION_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.action_timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid {}: {:?}", ACTION_TIMEOUT_ENV, raw),
            }
        }
        if let Some(raw) = lookup(ALLOW_NOOP_EDITS_ENV) {
            match parse_bool(&raw) {
                Some(value) => self.allow_noop_edits = value,
                None => warn!("Ignoring invalid {}: {:?}", ALLOW_NOOP_EDITS_ENV, raw),
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Locates the data directory and loads configuration from it.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    data_dir: PathBuf,
}

impl ConfigStore {
    /// Resolve the data directory: explicit flag, then `AGENT_ACTIONS_HOME`,
    /// then `~/.agent-actions`.
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        Self::resolve(data_dir, &|key| std::env::var(key).ok())
    }

    fn resolve(data_dir: Option<PathBuf>, lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => match lookup(HOME_ENV).filter(|v| !v.is_empty()) {
                Some(dir) => PathBuf::from(dir),
                None => dirs::home_dir()
                    .context("Could not determine home directory")?
                    .join(DATA_DIR_NAME),
            },
        };
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }

    /// Load config.json (defaults if absent) with environment overrides.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with(&|key| std::env::var(key).ok())
    }

    fn load_with(&self, lookup: &impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        let path = self.config_path();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            let mut config: AppConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?;
            // Languages the file does not mention keep their defaults
            for (language, argv) in default_package_managers() {
                config.package_managers.entry(language).or_insert(argv);
            }
            debug!("Loaded config from {}", path.display());
            config
        } else {
            AppConfig::default()
        };

        config.apply_env(lookup);
        Ok(config)
    }
}
