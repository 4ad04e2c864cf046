//! Workload-driven group-by materialization.
//!
//! [`MaterializationCache`] decides, request by request, whether a grouping
//! query can be rolled up from a finer grouping it already holds or must be
//! computed from the base table and materialized.
//!
//! ```text
//!            query Q
//!               │
//!     ┌─────────▼──────────┐   first M ⊇ Q in        ┌──────────────┐
//!     │  subsumption scan  ├──insertion order───────►│ hit: card(M) │
//!     └─────────┬──────────┘                         └──────────────┘
//!               │ none
//!     ┌─────────▼──────────┐   |set| > capacity      ┌──────────────────────┐
//!     │ miss: card(Q),     ├────────────────────────►│ evict min card entry │
//!     │ admit Q            │                         └──────────────────────┘
//!     └────────────────────┘
//! ```
//!
//! Eviction removes the entry with the *smallest* cardinality, keeping the
//! results that are most expensive to recompute.

mod report;

pub use report::{batch_report, BatchReport, CostAccumulator, ReplayReport, StepRecord};

use std::sync::Arc;

use tracing::{debug, trace};

use crate::attribute::{GroupingKey, KeyError};
use crate::catalog::CardinalityCatalog;

/// Errors raised by the cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache capacity must be positive, got {0}")]
    InvalidCapacity(usize),

    #[error("unknown grouping key \"{0}\"")]
    UnknownKey(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Result of serving one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeOutcome {
    /// I/O charged for this request.
    pub cost: u64,
    /// True when answered from a materialized grouping.
    pub hit: bool,
    /// The grouping that was read: the covering entry on a hit, the query
    /// itself on a miss.
    pub source: GroupingKey,
    /// Entry removed to restore the capacity bound, if any.
    pub evicted: Option<GroupingKey>,
}

/// Capacity-bounded set of materialized groupings.
#[derive(Debug, Clone)]
pub struct MaterializationCache {
    catalog: Arc<CardinalityCatalog>,
    capacity: usize,
    /// Entries with their catalog cardinality, in insertion order; scans and
    /// eviction ties follow it.
    materialized: Vec<(GroupingKey, u64)>,
    cumulative_io: u64,
}

impl MaterializationCache {
    pub fn new(catalog: Arc<CardinalityCatalog>, capacity: usize) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            catalog,
            capacity,
            materialized: Vec::with_capacity(capacity + 1),
            cumulative_io: 0,
        })
    }

    /// Serve one grouping request.
    ///
    /// Fails without touching any state when the query is not covered by
    /// the catalog.
    pub fn serve(&mut self, query: GroupingKey) -> CacheResult<ServeOutcome> {
        let catalog = Arc::clone(&self.catalog);
        let universe = catalog.universe();
        universe.check(&query)?;
        let query_card = catalog
            .cardinality(&query)
            .ok_or_else(|| CacheError::UnknownKey(universe.code(&query)))?;

        let covering = self
            .materialized
            .iter()
            .copied()
            .find(|(m, _)| query.is_subset_of(m));

        let outcome = match covering {
            Some((source, cost)) => {
                trace!(
                    query = %universe.code(&query),
                    source = %universe.code(&source),
                    cost,
                    "roll-up hit"
                );
                ServeOutcome {
                    cost,
                    hit: true,
                    source,
                    evicted: None,
                }
            }
            None => {
                self.materialized.push((query, query_card));
                let evicted = self.evict_if_over();
                trace!(query = %universe.code(&query), cost = query_card, "miss");
                ServeOutcome {
                    cost: query_card,
                    hit: false,
                    source: query,
                    evicted,
                }
            }
        };

        self.cumulative_io = self.cumulative_io.saturating_add(outcome.cost);
        Ok(outcome)
    }

    /// Parse a canonical code and serve it.
    pub fn serve_code(&mut self, code: &str) -> CacheResult<ServeOutcome> {
        let key = self.catalog.universe().parse(code)?;
        self.serve(key)
    }

    fn evict_if_over(&mut self) -> Option<GroupingKey> {
        if self.materialized.len() <= self.capacity {
            return None;
        }
        // `min_by_key` keeps the first of equal minima: the earliest insert.
        let (index, _) = self
            .materialized
            .iter()
            .enumerate()
            .min_by_key(|(_, (_, card))| *card)?;
        let (victim, cardinality) = self.materialized.remove(index);
        debug!(
            evicted = %self.catalog.universe().code(&victim),
            cardinality,
            "evicted smallest materialization"
        );
        Some(victim)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cumulative_io(&self) -> u64 {
        self.cumulative_io
    }

    /// Materialized groupings in insertion order.
    pub fn materialized(&self) -> Vec<GroupingKey> {
        self.materialized.iter().map(|(key, _)| *key).collect()
    }

    /// Materialized groupings with the cardinality they were admitted at.
    pub fn materialized_entries(&self) -> &[(GroupingKey, u64)] {
        &self.materialized
    }

    pub fn is_materialized(&self, key: &GroupingKey) -> bool {
        self.materialized.iter().any(|(m, _)| m == key)
    }

    /// Canonical codes of the materialized groupings, in insertion order.
    pub fn materialized_codes(&self) -> Vec<String> {
        let universe = self.catalog.universe();
        self.materialized
            .iter()
            .map(|(key, _)| universe.code(key))
            .collect()
    }

    pub fn catalog(&self) -> &Arc<CardinalityCatalog> {
        &self.catalog
    }
}
