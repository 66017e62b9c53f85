//! Client configuration — region/credential resolution and wait budgets.
//!
//! Parsed from a TOML file with every field optional; defaults are
//! applied on load. The effective region for one operation is resolved
//! with per-operation override > `QUIESCE_REGION` env > config file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the configured region.
pub const REGION_ENV: &str = "QUIESCE_REGION";

const DEFAULT_BUDGET_SECS: u64 = 30 * 60;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Errors raised while loading the control configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Raw TOML shape — everything optional.
#[derive(Debug, Deserialize)]
struct ControlConfigFile {
    region: Option<String>,
    profile: Option<String>,
    endpoint: Option<String>,
    budget_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlConfig {
    /// Default region, if configured.
    pub region: Option<String>,
    /// Named credential profile, if configured.
    pub profile: Option<String>,
    /// Custom control endpoint, if configured.
    pub endpoint: Option<String>,
    /// Per-resource convergence budget in seconds.
    pub budget_secs: u64,
    /// Manual poll interval in seconds.
    pub poll_interval_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            endpoint: None,
            budget_secs: DEFAULT_BUDGET_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl ControlConfig {
    /// Load configuration from a TOML file, applying defaults for
    /// anything the file omits.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!(?path, region = ?config.region, "control config loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: ControlConfigFile = toml::from_str(content)?;
        Ok(Self {
            region: raw.region,
            profile: raw.profile,
            endpoint: raw.endpoint,
            budget_secs: raw.budget_secs.unwrap_or(DEFAULT_BUDGET_SECS),
            poll_interval_secs: raw.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        })
    }

    /// Effective region for one operation.
    ///
    /// Precedence: the operation's own override, then `QUIESCE_REGION`,
    /// then the configured default.
    pub fn resolve_region(&self, per_operation: Option<&str>) -> Option<String> {
        self.resolve_region_with(per_operation, std::env::var(REGION_ENV).ok())
    }

    fn resolve_region_with(
        &self,
        per_operation: Option<&str>,
        env_region: Option<String>,
    ) -> Option<String> {
        per_operation
            .map(str::to_string)
            .or(env_region)
            .or_else(|| self.region.clone())
    }

    /// Per-resource convergence budget.
    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }

    /// Manual poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
