//! # Rollup
//!
//! A workload-driven group-by materialization cache, and the harness that
//! benchmarks it against a synthetic SQLite table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            AttributeUniverse / GroupingKey               │
//! │        (bitmask subsets, canonical codes "AC")           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [catalog builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │     CardinalityCatalog (exact, immutable, Arc-shared)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [one request at a time]
//! ┌─────────────────────────────────────────────────────────┐
//! │   MaterializationCache  ◄──  WorkloadStream              │
//! │   (roll-up hits, admission, smallest-first eviction)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [observe]
//! ┌─────────────────────────────────────────────────────────┐
//! │      CostAccumulator → ReplayReport / BatchReport        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rollup::attribute::AttributeUniverse;
//! use rollup::catalog::CardinalityCatalog;
//! use rollup::materialize::MaterializationCache;
//!
//! let universe = AttributeUniverse::from_symbols("ABC").unwrap();
//! let catalog = CardinalityCatalog::from_codes(universe, [("A", 10), ("AB", 1000)]).unwrap();
//! let mut cache = MaterializationCache::new(Arc::new(catalog), 2).unwrap();
//!
//! assert!(!cache.serve_code("AB").unwrap().hit);
//! let outcome = cache.serve_code("A").unwrap();
//! assert!(outcome.hit);
//! assert_eq!(outcome.cost, 1000);
//! ```

pub mod attribute;
pub mod catalog;
pub mod config;
pub mod dataset;
pub mod experiment;
pub mod logging;
pub mod materialize;
pub mod random;
pub mod sql;
pub mod store;
pub mod workload;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::attribute::{Attribute, AttributeUniverse, GroupingKey, KeyError};
    pub use crate::catalog::{
        CardinalityCatalog, CardinalitySource, CatalogBuilder, CatalogError, SqliteSource,
        StaticSource,
    };
    pub use crate::materialize::{
        batch_report, BatchReport, CacheError, CostAccumulator, MaterializationCache,
        ReplayReport, ServeOutcome,
    };
    pub use crate::workload::{Sampling, Workload, WorkloadStream};
}

pub use attribute::{AttributeUniverse, GroupingKey};
pub use catalog::CardinalityCatalog;
pub use materialize::{MaterializationCache, ServeOutcome};
pub use workload::Workload;
