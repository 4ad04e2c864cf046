//! Configuration module for rollup.
//!
//! Handles the experiment config file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, AttributeSettings, CacheSettings, CatalogMode, CatalogSettings,
    DatasetSettings, Settings, SettingsError, WorkloadSettings,
};
