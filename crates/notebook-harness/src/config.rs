use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use notebook_harness_core::naming::{TierThresholds, DEFAULT_PATTERN};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub notebooks: NotebooksConfig,
    #[serde(default = "default_tiers")]
    pub tiers: BTreeMap<String, u32>,
    #[serde(default)]
    pub naming: NamingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Base URL of the notebook service, e.g. `https://notebooks.internal`.
    pub base_url: String,
    /// Optional file holding the bearer token; the `NOTEBOOK_API_TOKEN`
    /// environment variable takes precedence.
    #[serde(default)]
    pub auth_token_path: Option<PathBuf>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Fixed per-operation-class timeouts. Content-bearing inserts and
/// free-text queries get longer budgets than notebook CRUD.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TimeoutConfig {
    #[serde(default = "default_control_secs")]
    pub control_secs: u64,
    #[serde(default = "default_ingest_secs")]
    pub ingest_secs: u64,
    #[serde(default = "default_query_secs")]
    pub query_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            control_secs: default_control_secs(),
            ingest_secs: default_ingest_secs(),
            query_secs: default_query_secs(),
        }
    }
}

fn default_control_secs() -> u64 {
    15
}
fn default_ingest_secs() -> u64 {
    60
}
fn default_query_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotebooksConfig {
    /// Collection name → notebook id.
    #[serde(default)]
    pub mapping: HashMap<String, String>,
    /// Fallback notebook id for unmapped collections. With neither a
    /// mapping entry nor this set, operations on a collection fail.
    #[serde(default)]
    pub default_notebook: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NamingConfig {
    /// Source-name pattern. Placeholders: `{tier}`, `{context_type}`,
    /// `{uri_hash}`, `{title}`, `{status}`.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        NamingConfig {
            pattern: default_pattern(),
        }
    }
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_tiers() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("L0".to_string(), 100),
        ("L1".to_string(), 2000),
        ("L2".to_string(), 0),
    ])
}

impl Config {
    /// Check configuration invariants. Called by [`load_config`] and again
    /// by the backend constructor so hand-built configs fail just as early.
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            bail!("service.base_url must be set");
        }

        if self.notebooks.mapping.is_empty() && self.notebooks.default_notebook.is_none() {
            bail!(
                "notebook backend requires either [notebooks.mapping] entries \
                 or notebooks.default_notebook"
            );
        }

        let missing: Vec<&str> = ["L0", "L1", "L2"]
            .into_iter()
            .filter(|t| !self.tiers.contains_key(*t))
            .collect();
        if !missing.is_empty() {
            bail!("tier config missing required tiers: {}", missing.join(", "));
        }

        if !self.naming.pattern.contains("{tier}") {
            bail!("naming.pattern must include the {{tier}} placeholder");
        }

        Ok(())
    }

    /// Tier thresholds as a typed struct. Only meaningful after
    /// [`validate`](Config::validate) has passed.
    pub fn thresholds(&self) -> TierThresholds {
        TierThresholds {
            l0: self.tiers.get("L0").copied().unwrap_or(100),
            l1: self.tiers.get("L1").copied().unwrap_or(2000),
            l2: self.tiers.get("L2").copied().unwrap_or(0),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
