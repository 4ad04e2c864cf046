//! Distinct-group count sources.

use std::collections::HashMap;

use super::{CatalogError, CatalogResult};
use crate::attribute::{AttributeUniverse, GroupingKey};

/// The dataset capability the catalog builder consumes.
///
/// Implementations must be exact and side-effect free: asking twice for the
/// same key returns the same count.
pub trait CardinalitySource {
    /// Number of distinct value combinations of `key`'s attributes.
    fn distinct_count(&self, universe: &AttributeUniverse, key: &GroupingKey)
        -> CatalogResult<u64>;
}

/// In-memory source keyed by canonical code.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    counts: HashMap<String, u64>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a count for a canonical code.
    pub fn with(mut self, code: impl Into<String>, count: u64) -> Self {
        self.counts.insert(code.into(), count);
        self
    }
}

impl FromIterator<(String, u64)> for StaticSource {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl CardinalitySource for StaticSource {
    fn distinct_count(
        &self,
        universe: &AttributeUniverse,
        key: &GroupingKey,
    ) -> CatalogResult<u64> {
        let code = universe.code(key);
        self.counts
            .get(&code)
            .copied()
            .ok_or(CatalogError::MissingCardinality(code))
    }
}
