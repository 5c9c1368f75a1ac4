// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

// Manager Configuration Types
//
// Operational settings for the tag manager, loaded from YAML:
// - Document store backend and location
// - Association rule names (product tag, org/space tag) and conflict policy
// - Enforcement sentinel prefix, concurrency, timeout and retry settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::enforcement::DEFAULT_SENTINEL_PREFIX;
use crate::domain::repository::StorageBackend;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub association: AssociationConfig,

    #[serde(default)]
    pub enforcement: EnforcementConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub backend: StoreKind,

    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_kind(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    pub fn backend(&self) -> StorageBackend {
        match self.backend {
            StoreKind::Memory => StorageBackend::InMemory,
            StoreKind::Sled => StorageBackend::Sled {
                path: self.path.clone(),
            },
        }
    }
}

/// What to do when an org-derived product disagrees with a valid product tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    Overwrite,
    WarnOnly,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "warn_only" | "warn-only" | "warn" => Ok(Self::WarnOnly),
            other => anyhow::bail!("Unknown conflict policy '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationConfig {
    #[serde(default = "default_product_tag")]
    pub product_tag: String,

    #[serde(default = "default_org_space_tag")]
    pub org_space_tag: String,

    #[serde(default = "default_conflict_policy")]
    pub conflict_policy: ConflictPolicy,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            product_tag: default_product_tag(),
            org_space_tag: default_org_space_tag(),
            conflict_policy: default_conflict_policy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementConfig {
    #[serde(default = "default_sentinel_prefix")]
    pub sentinel_prefix: String,

    /// Writes in flight at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default = "default_call_timeout_seconds")]
    pub call_timeout_seconds: u64,

    /// Retries after the first attempt, throttling errors only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            sentinel_prefix: default_sentinel_prefix(),
            max_in_flight: default_max_in_flight(),
            call_timeout_seconds: default_call_timeout_seconds(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_store_kind() -> StoreKind {
    StoreKind::Sled
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./tag-manager-data")
}

fn default_product_tag() -> String {
    "product".to_string()
}

fn default_org_space_tag() -> String {
    "org.space".to_string()
}

fn default_conflict_policy() -> ConflictPolicy {
    ConflictPolicy::Overwrite
}

fn default_sentinel_prefix() -> String {
    DEFAULT_SENTINEL_PREFIX.to_string()
}

fn default_max_in_flight() -> usize {
    1
}

fn default_call_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_jitter() -> bool {
    true
}

impl ManagerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. TAGMAN_CONFIG_PATH environment variable
    /// 2. ./tagman-config.yaml (working directory)
    /// 3. ~/.tagman/config.yaml (user home)
    /// 4. /etc/tagman/config.yaml (system, Unix) or C:\ProgramData\TagManager\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TAGMAN_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./tagman-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".tagman").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/tagman/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\TagManager\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load from an explicit path, else discovery, else defaults
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must load
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TAGMAN_STORE_PATH") {
            tracing::info!("Environment override: TAGMAN_STORE_PATH={}", path);
            self.store.path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("TAGMAN_MAX_IN_FLIGHT") {
            match val.parse::<usize>() {
                Ok(n) => {
                    tracing::info!("Environment override: TAGMAN_MAX_IN_FLIGHT={}", n);
                    self.enforcement.max_in_flight = n;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for TAGMAN_MAX_IN_FLIGHT: '{}'. Expected a number. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("TAGMAN_CONFLICT_POLICY") {
            match val.parse::<ConflictPolicy>() {
                Ok(policy) => {
                    tracing::info!("Environment override: TAGMAN_CONFLICT_POLICY={:?}", policy);
                    self.association.conflict_policy = policy;
                }
                Err(e) => tracing::warn!("{}. Ignoring TAGMAN_CONFLICT_POLICY.", e),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enforcement.max_in_flight == 0 {
            anyhow::bail!("enforcement.max_in_flight must be at least 1");
        }

        if self.enforcement.call_timeout_seconds == 0 {
            anyhow::bail!("enforcement.call_timeout_seconds must be at least 1");
        }

        if self.enforcement.sentinel_prefix.trim().is_empty() {
            anyhow::bail!("enforcement.sentinel_prefix cannot be empty");
        }

        if self.enforcement.base_backoff_ms > self.enforcement.max_backoff_ms {
            anyhow::bail!(
                "enforcement.base_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.enforcement.base_backoff_ms,
                self.enforcement.max_backoff_ms
            );
        }

        if self.association.product_tag.trim().is_empty() {
            anyhow::bail!("association.product_tag cannot be empty");
        }

        if self.association.org_space_tag.trim().is_empty() {
            anyhow::bail!("association.org_space_tag cannot be empty");
        }

        if self.store.backend == StoreKind::Sled && self.store.path.as_os_str().is_empty() {
            anyhow::bail!("store.path is required for the sled backend");
        }

        Ok(())
    }
}
