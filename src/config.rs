use crate::compare::{StatSchema, DEFAULT_KEY_COLUMNS};
use crate::compiler::{HashOptions, DEFAULT_TOP_N};
use crate::error::{MigCheckError, Result};
use crate::executor::{DEFAULT_CLOUD_PARALLELISM, DEFAULT_LEGACY_PARALLELISM};
use crate::hash::DEFAULT_SAMPLE_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const LEGACY_PARALLELISM_ENV: &str = "MIGCHECK_LEGACY_PARALLELISM";
pub const CLOUD_PARALLELISM_ENV: &str = "MIGCHECK_CLOUD_PARALLELISM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub top_n: usize,
    pub schema: StatSchema,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            schema: StatSchema::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    #[serde(flatten)]
    pub options: HashOptions,
    pub sample_limit: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            options: HashOptions::default(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub count: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_KEY_COLUMNS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelismConfig {
    pub legacy: usize,
    pub cloud: usize,
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            legacy: DEFAULT_LEGACY_PARALLELISM,
            cloud: DEFAULT_CLOUD_PARALLELISM,
        }
    }
}

/// Tunables for a reconciliation run. Every section is optional in YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub stats: StatsConfig,
    pub hash: HashConfig,
    pub keys: KeysConfig,
    pub parallelism: ParallelismConfig,
}

impl ReconConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: ReconConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a YAML file, then applies environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&contents)?.with_env_overrides(|k| std::env::var(k).ok())?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Applies `MIGCHECK_*_PARALLELISM` values from `lookup`. Unparseable
    /// values are rejected.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, slot) in [
            (LEGACY_PARALLELISM_ENV, &mut self.parallelism.legacy),
            (CLOUD_PARALLELISM_ENV, &mut self.parallelism.cloud),
        ] {
            if let Some(raw) = lookup(var) {
                *slot = raw.trim().parse().map_err(|_| {
                    MigCheckError::Config(format!(
                        "{} must be a positive integer, got '{}'",
                        var, raw
                    ))
                })?;
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stats.top_n == 0 {
            return Err(MigCheckError::Config("stats.top_n must be at least 1".to_string()));
        }
        if self.hash.options.separator.is_empty() {
            return Err(MigCheckError::Config("hash.separator must not be empty".to_string()));
        }
        if self.parallelism.legacy == 0 || self.parallelism.cloud == 0 {
            return Err(MigCheckError::Config(
                "parallelism must be at least 1 per platform".to_string(),
            ));
        }
        if self.keys.count == 0 {
            warn!("keys.count is 0, row hashing will have no key columns");
        }
        for (field, kind) in self.stats.schema.iter() {
            if let Some((atol, rtol)) = kind.tolerances() {
                if atol < 0.0 || rtol < 0.0 {
                    return Err(MigCheckError::Config(format!(
                        "negative tolerance for statistic '{}'",
                        field
                    )));
                }
            }
        }
        Ok(())
    }
}
