//! End-to-end materialization experiments.
//!
//! Ties the dataset, catalog, workload and cache together the way the
//! benchmark harness runs them:
//!
//! ```text
//! generate table → build catalog → sample workload → replay per capacity
//! ```
//!
//! Each stage persists its output in the [`ExperimentStore`], so stages can
//! also be run one at a time from the CLI.
//!
//! # Example
//!
//! ```ignore
//! use rollup::config::Settings;
//! use rollup::experiment::Experiment;
//!
//! let mut experiment = Experiment::open(Settings::load()?)?;
//! let run = experiment.run()?;
//! println!("{}\n\n{}", run.catalog, run.report);
//! ```

use std::sync::Arc;

use tracing::info;

use crate::attribute::AttributeUniverse;
use crate::catalog::{CardinalityCatalog, CatalogBuilder, CatalogError, SqliteSource};
use crate::config::{CatalogMode, Settings, SettingsError};
use crate::dataset::{self, DatasetError};
use crate::materialize::{batch_report, BatchReport, CacheError};
use crate::random::seeded_rng;
use crate::store::{ExperimentStore, StoreError};
use crate::workload::{Workload, WorkloadError};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while running an experiment.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Workload error: {0}")]
    Workload(#[from] WorkloadError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("no catalog stored; run `rollup catalog` first")]
    MissingCatalog,

    #[error("no workload stored; run `rollup workload` first")]
    MissingWorkload,
}

pub type ExperimentResult<T> = Result<T, ExperimentError>;

// ============================================================================
// Experiment
// ============================================================================

/// Everything a full run produced.
#[derive(Debug, Clone)]
pub struct ExperimentRun {
    /// Rows written to the dataset table.
    pub rows: u64,
    /// The catalog counted on that table.
    pub catalog: Arc<CardinalityCatalog>,
    pub report: BatchReport,
}

/// A configured experiment bound to its store.
pub struct Experiment {
    settings: Settings,
    universe: AttributeUniverse,
    store: ExperimentStore,
}

impl Experiment {
    /// Open the store at the configured dataset path.
    pub fn open(settings: Settings) -> ExperimentResult<Self> {
        let store = ExperimentStore::open(settings.dataset_path()?)?;
        Self::with_store(settings, store)
    }

    /// Run against an already opened store.
    pub fn with_store(settings: Settings, store: ExperimentStore) -> ExperimentResult<Self> {
        settings.validate()?;
        let universe = settings.universe()?;
        Ok(Self {
            settings,
            universe,
            store,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn universe(&self) -> &AttributeUniverse {
        &self.universe
    }

    pub fn store(&self) -> &ExperimentStore {
        &self.store
    }

    /// Recreate and fill the dataset table. Returns the row count.
    ///
    /// The stored catalog and workload describe the previous table, so both
    /// are cleared.
    pub fn generate(&mut self) -> ExperimentResult<u64> {
        let table = self.settings.synthetic_table()?;
        let mut rng = seeded_rng(self.settings.dataset.seed);
        let rows = dataset::draw_row_count(
            self.settings.dataset.min_rows,
            self.settings.dataset.max_rows,
            &mut rng,
        )?;
        let written = table.generate(self.store.connection_mut(), rows, &mut rng)?;
        self.store.clear_all()?;
        info!(rows = written, "cleared stored catalog and workload");
        Ok(written)
    }

    /// Build the catalog against the dataset table and store it.
    ///
    /// In [`CatalogMode::Workload`] only the groupings of `workload` are
    /// counted; without a workload every subset is.
    pub fn build_catalog(
        &mut self,
        workload: Option<&Workload>,
    ) -> ExperimentResult<Arc<CardinalityCatalog>> {
        let catalog = {
            let source = SqliteSource::new(self.store.connection(), &self.settings.dataset.table);
            let builder = CatalogBuilder::new(self.universe.clone(), &source);
            match (self.settings.catalog.mode, workload) {
                (CatalogMode::Workload, Some(workload)) => {
                    builder.build_for(workload.queries().iter().copied())?
                }
                _ => builder.build()?,
            }
        };
        self.store.save_catalog(&catalog)?;
        Ok(Arc::new(catalog))
    }

    /// Sample a workload over every grouping of the universe and store it.
    pub fn sample_workload(&mut self) -> ExperimentResult<Workload> {
        let mut rng = seeded_rng(self.settings.workload.seed);
        let workload = Workload::sample(
            &self.universe.all_keys(),
            self.settings.workload.queries,
            self.settings.workload.sampling,
            &mut rng,
        )?;
        info!(queries = ?workload.codes(&self.universe), "sampled workload");
        self.store.save_workload(&self.universe, &workload)?;
        Ok(workload)
    }

    /// Replay the stored workload against the stored catalog.
    ///
    /// Uses the configured capacities unless `capacities` is non-empty.
    pub fn replay(&self, capacities: &[usize]) -> ExperimentResult<BatchReport> {
        let catalog = self
            .store
            .load_catalog(&self.universe)?
            .ok_or(ExperimentError::MissingCatalog)?;
        let workload = self
            .store
            .load_workload(&self.universe)?
            .ok_or(ExperimentError::MissingWorkload)?;
        self.compare(&Arc::new(catalog), &workload, capacities)
    }

    fn compare(
        &self,
        catalog: &Arc<CardinalityCatalog>,
        workload: &Workload,
        capacities: &[usize],
    ) -> ExperimentResult<BatchReport> {
        let capacities = if capacities.is_empty() {
            &self.settings.cache.capacities[..]
        } else {
            capacities
        };
        let report = batch_report(catalog, workload, capacities)?;
        Ok(report.with_fingerprint(catalog.fingerprint()?))
    }

    /// Run every stage in order and compare the configured capacities.
    pub fn run(&mut self) -> ExperimentResult<ExperimentRun> {
        let rows = self.generate()?;
        info!(rows, "dataset ready");

        let (catalog, workload) = match self.settings.catalog.mode {
            CatalogMode::Full => {
                let catalog = self.build_catalog(None)?;
                (catalog, self.sample_workload()?)
            }
            CatalogMode::Workload => {
                let workload = self.sample_workload()?;
                (self.build_catalog(Some(&workload))?, workload)
            }
        };
        let report = self.compare(&catalog, &workload, &[])?;
        Ok(ExperimentRun {
            rows,
            catalog,
            report,
        })
    }
}
