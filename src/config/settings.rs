//! TOML-based configuration for rollup.
//!
//! Supports a config file (rollup.toml) with environment variable expansion
//! in the dataset path. Every section is optional; the defaults reproduce the
//! reference experiment.
//!
//! Example configuration:
//! ```toml
//! [dataset]
//! path = "${ROLLUP_DATA}/groupby.db"
//! table = "testGroupby"
//! min_rows = 500000
//! max_rows = 1000000
//! seed = 42
//!
//! [[dataset.attributes]]
//! symbol = "A"
//! domain = 10
//!
//! [[dataset.attributes]]
//! symbol = "B"
//! column = "region"
//! domain = 100
//!
//! [catalog]
//! mode = "full"      # or "workload"
//!
//! [workload]
//! queries = 10
//! sampling = "distinct"
//!
//! [cache]
//! capacities = [2, 4, 6]
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::attribute::{Attribute, AttributeUniverse};
use crate::dataset::{ColumnSpec, SyntheticTable};
use crate::workload::Sampling;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub dataset: DatasetSettings,
    pub catalog: CatalogSettings,
    pub workload: WorkloadSettings,
    pub cache: CacheSettings,
}

/// Synthetic dataset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// SQLite database file (supports ${ENV_VAR} expansion).
    pub path: String,

    /// Table holding the generated rows.
    pub table: String,

    /// Inclusive lower bound of the generated row count.
    pub min_rows: u64,

    /// Exclusive upper bound of the generated row count.
    pub max_rows: u64,

    /// Seed for row generation. Unset draws from the OS.
    pub seed: Option<u64>,

    /// Groupable attributes, in universe order.
    pub attributes: Vec<AttributeSettings>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: "db_files/groupby.db".to_string(),
            table: "testGroupby".to_string(),
            min_rows: 500_000,
            max_rows: 1_000_000,
            seed: None,
            attributes: vec![
                AttributeSettings::new('A', 10),
                AttributeSettings::new('B', 100),
                AttributeSettings::new('C', 1000),
                AttributeSettings::new('D', 10000),
            ],
        }
    }
}

/// One attribute column.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttributeSettings {
    /// Single-character identifier used in grouping codes.
    pub symbol: char,

    /// Column name (defaults to the symbol).
    #[serde(default)]
    pub column: Option<String>,

    /// Values are drawn from `1..=domain`.
    pub domain: u32,
}

impl AttributeSettings {
    pub fn new(symbol: char, domain: u32) -> Self {
        Self {
            symbol,
            column: None,
            domain,
        }
    }

    pub fn attribute(&self) -> Attribute {
        match &self.column {
            Some(column) => Attribute::new(self.symbol, column.clone()),
            None => Attribute::named(self.symbol),
        }
    }
}

/// Which groupings the catalog counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogMode {
    /// Every non-empty subset of the universe.
    #[default]
    Full,
    /// Only the groupings the workload requests.
    Workload,
}

/// Catalog configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub mode: CatalogMode,
}

/// Workload sampling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadSettings {
    /// Number of grouping queries to draw.
    pub queries: usize,

    /// Distinct (without replacement) or uniform (with replacement).
    pub sampling: Sampling,

    /// Seed for sampling. Unset draws from the OS.
    pub seed: Option<u64>,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            queries: 10,
            sampling: Sampling::Distinct,
            seed: None,
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Capacities to compare, in report order.
    pub capacities: Vec<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacities: vec![2, 4, 6],
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `ROLLUP_CONFIG`
    /// 2. `./rollup.toml`
    /// 3. `~/.config/rollup/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("ROLLUP_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("rollup.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rollup").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings no experiment can run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| Err(SettingsError::InvalidConfig(msg));

        if self.dataset.min_rows > self.dataset.max_rows {
            return invalid(format!(
                "dataset.min_rows ({}) exceeds dataset.max_rows ({})",
                self.dataset.min_rows, self.dataset.max_rows
            ));
        }
        if let Some(attr) = self.dataset.attributes.iter().find(|a| a.domain == 0) {
            return invalid(format!("attribute '{}' has domain 0", attr.symbol));
        }
        self.universe()?;

        if self.cache.capacities.is_empty() {
            return invalid("cache.capacities must list at least one capacity".to_string());
        }
        if self.cache.capacities.contains(&0) {
            return invalid("cache capacities must be positive".to_string());
        }
        Ok(())
    }

    /// The attribute universe described by `[[dataset.attributes]]`.
    pub fn universe(&self) -> Result<AttributeUniverse, SettingsError> {
        AttributeUniverse::new(
            self.dataset
                .attributes
                .iter()
                .map(AttributeSettings::attribute)
                .collect(),
        )
        .map_err(|e| SettingsError::InvalidConfig(e.to_string()))
    }

    /// The synthetic table layout for the dataset generator.
    pub fn synthetic_table(&self) -> Result<SyntheticTable, SettingsError> {
        let columns = self
            .dataset
            .attributes
            .iter()
            .map(|a| ColumnSpec {
                attribute: a.attribute(),
                domain: a.domain,
            })
            .collect();
        SyntheticTable::new(self.dataset.table.clone(), columns)
            .map_err(|e| SettingsError::InvalidConfig(e.to_string()))
    }

    /// The dataset path with environment variables expanded.
    pub fn dataset_path(&self) -> Result<PathBuf, SettingsError> {
        expand_env_vars(&self.dataset.path).map(PathBuf::from)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let lookup =
        |name: &str| env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()));

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('$') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}').unwrap_or(braced.len());
            result.push_str(&lookup(&braced[..end])?);
            rest = braced.get(end + 1..).unwrap_or("");
        } else {
            let end = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if end == 0 {
                result.push('$');
            } else {
                result.push_str(&lookup(&after[..end])?);
            }
            rest = &after[end..];
        }
    }
    result.push_str(rest);
    Ok(result)
}
