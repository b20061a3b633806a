use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{klog_debug, Error, Result};

/// What the dispatcher does when a task fails mid-dispatch.
///
/// The source demos show both behaviors without picking one; koan makes
/// the choice explicit configuration with `BestEffort` as the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Let every sibling task run to completion; all outcomes are returned.
    #[default]
    BestEffort,
    /// Cancel the dispatch on the first failure; queued siblings resolve
    /// as cancelled, in-flight siblings observe the token cooperatively.
    FailFast,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::BestEffort => write!(f, "best_effort"),
            FailurePolicy::FailFast => write!(f, "fail_fast"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Worker thread count; defaults to available hardware parallelism.
    pub workers: Option<usize>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Capacity of the pool event channel.
    pub event_capacity: Option<usize>,
}

impl Config {
    pub fn koan_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".koan"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::koan_dir()?.join("koan.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            klog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path, so tests can use temp directories.
    pub fn load_from(path: &Path) -> Result<Self> {
        klog_debug!("Config::load_from path={}", path.display());
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        klog_debug!(
            "Config loaded: workers={:?}, failure_policy={}, event_capacity={:?}",
            config.workers,
            config.failure_policy,
            config.event_capacity
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let koan_dir = Self::koan_dir()?;
        if !koan_dir.exists() {
            fs::create_dir_all(&koan_dir)?;
        }
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        klog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Worker count to use, falling back to available parallelism.
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Event channel capacity to use.
    pub fn effective_event_capacity(&self) -> usize {
        self.event_capacity.unwrap_or(100)
    }
}
