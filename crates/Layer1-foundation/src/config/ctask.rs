//! ctask Config
//!
//! Layered settings: global file, project file, then environment.
//! Command-line flags are applied last by the CLI.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::ContainerRuntime;

/// Settings file name
pub const CTASK_CONFIG_FILE: &str = "config.json";

/// Where FIFO-backed IO lives when nothing else is configured
pub const DEFAULT_FIFO_DIR: &str = "/run/ctask/fifo";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const ENV_ADDRESS: &str = "CTASK_ADDRESS";
const ENV_FIFO_DIR: &str = "CTASK_FIFO_DIR";
const ENV_RUNTIME: &str = "CTASK_RUNTIME";

// ============================================================================
// ctask Config
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtaskConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<ContainerRuntime>,

    /// Engine API address (`unix:///path` or a bare socket path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Connect/request timeout for the runtime client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifo_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Key sequence that detaches from a terminal-backed task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detach_keys: Option<String>,
}

impl CtaskConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Default::default()
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Global + project files, then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(global) = JsonStore::global() {
            config.merge_store(&global)?;
        }
        if let Ok(project) = JsonStore::current_project() {
            config.merge_store(&project)?;
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Merge the store's config file on top, when it has one
    fn merge_store(&mut self, store: &JsonStore) -> Result<()> {
        if let Some(file_config) = store.load_optional::<CtaskConfig>(CTASK_CONFIG_FILE)? {
            self.merge(file_config);
        }
        Ok(())
    }

    /// Apply `CTASK_*` overrides through the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ENV_ADDRESS).filter(|v| !v.is_empty()) {
            self.address = Some(address);
        }
        if let Some(dir) = lookup(ENV_FIFO_DIR).filter(|v| !v.is_empty()) {
            self.fifo_dir = Some(PathBuf::from(dir));
        }
        if let Some(runtime) = lookup(ENV_RUNTIME).filter(|v| !v.is_empty()) {
            self.runtime = Some(runtime.parse()?);
        }
        Ok(())
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Merge another config on top (other wins)
    pub fn merge(&mut self, other: CtaskConfig) {
        if other.runtime.is_some() {
            self.runtime = other.runtime;
        }
        if other.address.is_some() {
            self.address = other.address;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.fifo_dir.is_some() {
            self.fifo_dir = other.fifo_dir;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.detach_keys.is_some() {
            self.detach_keys = other.detach_keys;
        }
    }

    // ========================================================================
    // Resolved values
    // ========================================================================

    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime.unwrap_or_default()
    }

    pub fn address(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| self.runtime().default_address())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn fifo_dir(&self) -> PathBuf {
        self.fifo_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FIFO_DIR))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_runtime(mut self, runtime: ContainerRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_fifo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fifo_dir = Some(dir.into());
        self
    }
}

fn default_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CtaskConfig::new();
        assert_eq!(config.version, 1);
        assert_eq!(config.runtime(), ContainerRuntime::Docker);
        assert_eq!(config.address(), "unix:///var/run/docker.sock");
        assert_eq!(config.fifo_dir(), PathBuf::from(DEFAULT_FIFO_DIR));
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_merge() {
        let mut base = CtaskConfig::new().with_address("unix:///tmp/a.sock");
        base.log_level = Some("debug".to_string());

        let overlay = CtaskConfig::new()
            .with_address("unix:///tmp/b.sock")
            .with_fifo_dir("/tmp/fifo");

        base.merge(overlay);

        assert_eq!(base.address(), "unix:///tmp/b.sock");
        assert_eq!(base.fifo_dir(), PathBuf::from("/tmp/fifo"));
        assert_eq!(base.log_level(), "debug");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CTASK_ADDRESS", "unix:///tmp/env.sock"),
            ("CTASK_FIFO_DIR", "/tmp/env-fifo"),
            ("CTASK_RUNTIME", "podman"),
        ]
        .into_iter()
        .collect();

        let mut config = CtaskConfig::new().with_address("unix:///tmp/file.sock");
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.address(), "unix:///tmp/env.sock");
        assert_eq!(config.fifo_dir(), PathBuf::from("/tmp/env-fifo"));
        assert_eq!(config.runtime(), ContainerRuntime::Podman);
    }

    #[test]
    fn test_env_bad_runtime() {
        let mut config = CtaskConfig::new();
        let result = config.apply_env(|key| (key == "CTASK_RUNTIME").then(|| "lxc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        std::fs::write(
            store.file_path(CTASK_CONFIG_FILE),
            r#"{ "runtime": "podman", "timeoutSecs": 5, "detachKeys": "ctrl-p,ctrl-q" }"#,
        )
        .unwrap();

        let mut config = CtaskConfig::new().with_address("unix:///tmp/global.sock");
        config.merge_store(&store).unwrap();
        assert_eq!(config.address(), "unix:///tmp/global.sock");
        assert_eq!(config.runtime(), ContainerRuntime::Podman);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.detach_keys.as_deref(), Some("ctrl-p,ctrl-q"));
    }
}
