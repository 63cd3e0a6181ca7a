//! Configuration loading from TOML and environment variables.
//!
//! The service reads its configuration from:
//! 1. A TOML config file (passed with `--config`)
//! 2. Environment variables (override TOML values)
//!
//! Environment variable prefix: ORGCHART_

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use orgchart_hierarchy::TraversalLimits;
use orgchart_protocol::{DeletePolicy, ENV_PREFIX};

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Traversal bounds and deletion policy.
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    /// Page size defaults and limits.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Snapshot file location.
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Pin "today" for every query and write. Defaults to the current UTC date.
    #[serde(default)]
    pub evaluation_date: Option<NaiveDate>,
}

/// Hierarchy walk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Deepest level a single walk may reach.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Most positions a single walk may visit.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// Policy applied when a position with dependents is deleted.
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

/// Pagination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the caller gives none.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Largest page size a caller may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "orgchart_hierarchy=debug").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output JSON-formatted logs.
    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// JSON snapshot to load on startup.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// -- Defaults --

fn default_max_depth() -> u32 {
    orgchart_protocol::MAX_HIERARCHY_DEPTH
}
fn default_max_nodes() -> usize {
    orgchart_protocol::MAX_TRAVERSAL_NODES
}
fn default_page_size() -> usize {
    orgchart_protocol::DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> usize {
    orgchart_protocol::MAX_PAGE_SIZE
}
fn default_log_level() -> String {
    "info".to_string()
}

// -- Trait impls --

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
            delete_policy: DeletePolicy::default(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, anyhow::Error> {
        let config: ServiceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, with environment variable overrides.
    ///
    /// For example: `ORGCHART_MAX_PAGE_SIZE=200`
    pub fn load(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let mut config = if let Some(path) = path {
            if path.exists() {
                Self::from_file(path)?
            } else {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not found, using defaults"
                );
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Keys carry the `ORGCHART_` prefix.
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(val) = get("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = get("LOG_JSON") {
            self.logging.json_format = val == "true" || val == "1";
        }
        if let Some(val) = get("SNAPSHOT_PATH") {
            self.snapshot.path = Some(PathBuf::from(val));
        }
        if let Some(val) = get("MAX_DEPTH") {
            match val.parse() {
                Ok(depth) => self.hierarchy.max_depth = depth,
                Err(_) => warn_unparsed("MAX_DEPTH", &val),
            }
        }
        if let Some(val) = get("MAX_NODES") {
            match val.parse() {
                Ok(nodes) => self.hierarchy.max_nodes = nodes,
                Err(_) => warn_unparsed("MAX_NODES", &val),
            }
        }
        if let Some(val) = get("DELETE_POLICY") {
            match val.trim().to_ascii_lowercase().as_str() {
                "reject" => self.hierarchy.delete_policy = DeletePolicy::Reject,
                "cascade" => self.hierarchy.delete_policy = DeletePolicy::Cascade,
                _ => warn_unparsed("DELETE_POLICY", &val),
            }
        }
        if let Some(val) = get("DEFAULT_PAGE_SIZE") {
            match val.parse() {
                Ok(size) => self.pagination.default_page_size = size,
                Err(_) => warn_unparsed("DEFAULT_PAGE_SIZE", &val),
            }
        }
        if let Some(val) = get("MAX_PAGE_SIZE") {
            match val.parse() {
                Ok(size) => self.pagination.max_page_size = size,
                Err(_) => warn_unparsed("MAX_PAGE_SIZE", &val),
            }
        }
        if let Some(val) = get("EVALUATION_DATE") {
            match val.parse() {
                Ok(date) => self.evaluation_date = Some(date),
                Err(_) => warn_unparsed("EVALUATION_DATE", &val),
            }
        }
    }

    /// Reject settings no query could run under.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.pagination.max_page_size == 0 {
            anyhow::bail!("pagination.max_page_size must be positive");
        }
        if self.pagination.default_page_size == 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            anyhow::bail!(
                "pagination.default_page_size must be between 1 and {}",
                self.pagination.max_page_size
            );
        }
        if self.hierarchy.max_nodes == 0 {
            anyhow::bail!("hierarchy.max_nodes must be positive");
        }
        Ok(())
    }

    pub fn traversal_limits(&self) -> TraversalLimits {
        TraversalLimits {
            max_depth: self.hierarchy.max_depth,
            max_nodes: self.hierarchy.max_nodes,
        }
    }
}

fn warn_unparsed(name: &str, value: &str) {
    tracing::warn!(
        variable = %format!("{ENV_PREFIX}{name}"),
        value = %value,
        "Ignoring unparseable override"
    );
}
