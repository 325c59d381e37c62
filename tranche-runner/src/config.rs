//! TOML run configuration.
//!
//! A run file has three parts: `[run]` (balance and accounting policies),
//! `[data]` (where bars come from) and one `[[groups]]` table per top-level
//! allocation group. Group members are either plain symbol strings or
//! nested `{ name, members }` tables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tranche_core::data::Alignment;
use tranche_core::domain::{AllocationEntry, DuplicatePolicy, FlipPolicy, GroupConfig, GroupSpec};
use tranche_core::engine::EngineConfig;

/// Errors from reading or validating a run file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("initial_balance must be finite and positive, got {0}")]
    InvalidBalance(f64),

    #[error("synthetic data needs at least one bar per symbol")]
    ZeroBars,

    #[error("max_steps must be at least 1")]
    ZeroMaxSteps,

    #[error("config defines no [[groups]]")]
    NoGroups,

    #[error("group '{group}' contains a blank symbol")]
    BlankSymbol { group: String },
}

/// Where bars are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// One CSV file per symbol under `data.dir`.
    #[default]
    Csv,
    /// Seeded random walk; no files are read.
    Synthetic,
}

/// Complete description of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// `[run]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    pub initial_balance: f64,
    #[serde(default)]
    pub flip_policy: FlipPolicy,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

/// `[data]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default)]
    pub source: DataSource,
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// File-name suffix, as in `BTC-USD-1h.csv`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_bars")]
    pub bars: usize,
    #[serde(default)]
    pub seed: u64,
}

fn default_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_bars() -> usize {
    250
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            dir: default_dir(),
            interval: None,
            alignment: Alignment::default(),
            bars: default_bars(),
            seed: 0,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub balance: Option<f64>,
    pub data_dir: Option<PathBuf>,
    pub max_steps: Option<usize>,
}

impl RunConfig {
    /// Load and validate a run file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a run file from a string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that only make sense at the file boundary. Structural checks
    /// on the group tree (empty groups, duplicates) happen when the
    /// portfolio is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let balance = self.run.initial_balance;
        if !(balance.is_finite() && balance > 0.0) {
            return Err(ConfigError::InvalidBalance(balance));
        }
        if self.run.max_steps == Some(0) {
            return Err(ConfigError::ZeroMaxSteps);
        }
        if self.data.source == DataSource::Synthetic && self.data.bars == 0 {
            return Err(ConfigError::ZeroBars);
        }
        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        for group in &self.groups {
            check_symbols(group)?;
        }
        Ok(())
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(mut self, overrides: &RunOverrides) -> Result<Self, ConfigError> {
        if let Some(balance) = overrides.balance {
            self.run.initial_balance = balance;
        }
        if let Some(dir) = &overrides.data_dir {
            self.data.dir = dir.clone();
        }
        if let Some(max_steps) = overrides.max_steps {
            self.run.max_steps = Some(max_steps);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn group_config(&self) -> GroupConfig {
        GroupConfig {
            groups: self.groups.clone(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            flip_policy: self.run.flip_policy,
            max_steps: self.run.max_steps,
        }
    }
}

fn check_symbols(group: &GroupSpec) -> Result<(), ConfigError> {
    for member in &group.members {
        match member {
            AllocationEntry::Symbol(s) if s.trim().is_empty() => {
                return Err(ConfigError::BlankSymbol {
                    group: group.name.clone(),
                });
            }
            AllocationEntry::Symbol(_) => {}
            AllocationEntry::Group(sub) => check_symbols(sub)?,
        }
    }
    Ok(())
}
