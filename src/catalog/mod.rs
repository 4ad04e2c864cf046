//! Exact group-by cardinality catalogs.
//!
//! A catalog maps every grouping of an attribute universe to the number of
//! distinct value combinations the dataset produces under that grouping. It
//! is built once, checked for monotonicity, and then shared read-only
//! (behind an `Arc`) by every cache replaying against it.
//!
//! # Building
//!
//! ```text
//! CardinalitySource ──► CatalogBuilder::build()      all 2^n - 1 subsets
//!                   └─► CatalogBuilder::build_for()  only the keys a workload uses
//! ```
//!
//! Builds are all-or-nothing: the first failing count aborts the build and
//! no catalog value is produced.

mod source;
mod sqlite;

pub use source::{CardinalitySource, StaticSource};
pub use sqlite::SqliteSource;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::attribute::{AttributeUniverse, GroupingKey, KeyError};

/// Errors raised while building or validating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no cardinality available for \"{0}\"")]
    MissingCardinality(String),

    #[error("negative distinct count {count} for \"{code}\"")]
    InvalidCount { code: String, count: i64 },

    #[error("cardinality for \"{0}\" given twice")]
    DuplicateKey(String),

    #[error(
        "cardinality not monotonic: \"{subset}\" has {subset_cardinality} groups \
         but its superset \"{superset}\" has {superset_cardinality}"
    )]
    NotMonotonic {
        subset: String,
        subset_cardinality: u64,
        superset: String,
        superset_cardinality: u64,
    },

    #[error("failed to count groups for \"{code}\": {source}")]
    Count {
        code: String,
        #[source]
        source: Box<CatalogError>,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// One catalog row, as stored and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub cardinality: u64,
}

/// Immutable mapping from grouping key to exact cardinality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalityCatalog {
    universe: AttributeUniverse,
    cardinalities: BTreeMap<GroupingKey, u64>,
}

impl CardinalityCatalog {
    /// Build a catalog from known cardinalities.
    ///
    /// Rejects keys outside the universe, repeated keys, and any pair of
    /// present keys `S ⊂ S'` with `card(S) > card(S')`.
    pub fn from_entries<I>(universe: AttributeUniverse, entries: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = (GroupingKey, u64)>,
    {
        let mut cardinalities = BTreeMap::new();
        for (key, cardinality) in entries {
            universe.check(&key)?;
            if cardinalities.insert(key, cardinality).is_some() {
                return Err(CatalogError::DuplicateKey(universe.code(&key)));
            }
        }

        let catalog = Self {
            universe,
            cardinalities,
        };
        catalog.check_monotonic()?;
        Ok(catalog)
    }

    /// Build a catalog from `(code, cardinality)` pairs.
    pub fn from_codes<'c, I>(universe: AttributeUniverse, entries: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = (&'c str, u64)>,
    {
        let keyed = entries
            .into_iter()
            .map(|(code, card)| universe.parse(code).map(|key| (key, card)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_entries(universe, keyed)
    }

    pub fn universe(&self) -> &AttributeUniverse {
        &self.universe
    }

    /// Cardinality of a key, if the catalog covers it.
    pub fn cardinality(&self, key: &GroupingKey) -> Option<u64> {
        self.cardinalities.get(key).copied()
    }

    pub fn contains(&self, key: &GroupingKey) -> bool {
        self.cardinalities.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.cardinalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cardinalities.is_empty()
    }

    /// True when every non-empty subset of the universe is present.
    pub fn is_complete(&self) -> bool {
        self.len() == self.universe.mask() as usize
    }

    /// Covered keys, by size and then universe order.
    pub fn keys(&self) -> Vec<GroupingKey> {
        let mut keys: Vec<GroupingKey> = self.cardinalities.keys().copied().collect();
        keys.sort_by_key(|k| (k.len(), k.positions().collect::<Vec<_>>()));
        keys
    }

    /// Catalog rows in [`keys`](Self::keys) order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.keys()
            .into_iter()
            .map(|key| CatalogEntry {
                code: self.universe.code(&key),
                cardinality: self.cardinalities[&key],
            })
            .collect()
    }

    /// SHA256 over the JSON of the universe and every row, as lowercase hex.
    pub fn fingerprint(&self) -> CatalogResult<String> {
        let json = serde_json::to_vec(&(&self.universe, self.entries()))?;
        Ok(format!("{:x}", Sha256::digest(&json)))
    }

    fn check_monotonic(&self) -> CatalogResult<()> {
        if self.is_complete() {
            // Checking each key against its one-attribute extensions covers
            // every pair by transitivity.
            let n = self.universe.len();
            for (&key, &card) in &self.cardinalities {
                for p in (0..n).filter(|&p| !key.contains(p)) {
                    let extended = GroupingKey::from_bits(key.bits() | (1 << p))
                        .unwrap_or_else(|| unreachable!());
                    self.check_pair(key, card, extended, self.cardinalities[&extended])?;
                }
            }
        } else {
            for (&sub, &sub_card) in &self.cardinalities {
                for (&sup, &sup_card) in self.cardinalities.range(sub..) {
                    if sup != sub && sub.is_subset_of(&sup) {
                        self.check_pair(sub, sub_card, sup, sup_card)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn check_pair(
        &self,
        subset: GroupingKey,
        subset_cardinality: u64,
        superset: GroupingKey,
        superset_cardinality: u64,
    ) -> CatalogResult<()> {
        if subset_cardinality > superset_cardinality {
            return Err(CatalogError::NotMonotonic {
                subset: self.universe.code(&subset),
                subset_cardinality,
                superset: self.universe.code(&superset),
                superset_cardinality,
            });
        }
        Ok(())
    }
}

impl fmt::Display for CardinalityCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "catalog ({} groupings):", self.len())?;
        for entry in self.entries() {
            write!(f, "\n  {:<8} {}", entry.code, entry.cardinality)?;
        }
        Ok(())
    }
}

/// One-shot catalog construction over a [`CardinalitySource`].
pub struct CatalogBuilder<'a, S: CardinalitySource> {
    universe: AttributeUniverse,
    source: &'a S,
}

impl<'a, S: CardinalitySource> CatalogBuilder<'a, S> {
    pub fn new(universe: AttributeUniverse, source: &'a S) -> Self {
        Self { universe, source }
    }

    /// Count every non-empty subset of the universe.
    pub fn build(self) -> CatalogResult<CardinalityCatalog> {
        let keys = self.universe.all_keys();
        info!(
            attributes = self.universe.len(),
            subsets = keys.len(),
            "building full cardinality catalog"
        );
        self.build_keys(keys)
    }

    /// Count only the given keys, each once.
    ///
    /// Replay charges the cardinality of a query or of a materialized key,
    /// and every materialized key was once a query, so a workload's own keys
    /// are sufficient for replaying that workload.
    pub fn build_for<I>(self, keys: I) -> CatalogResult<CardinalityCatalog>
    where
        I: IntoIterator<Item = GroupingKey>,
    {
        let mut distinct: Vec<GroupingKey> = Vec::new();
        for key in keys {
            if !distinct.contains(&key) {
                distinct.push(key);
            }
        }
        info!(subsets = distinct.len(), "building workload cardinality catalog");
        self.build_keys(distinct)
    }

    fn build_keys(self, keys: Vec<GroupingKey>) -> CatalogResult<CardinalityCatalog> {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            self.universe.check(&key)?;
            let code = self.universe.code(&key);
            let count = self
                .source
                .distinct_count(&self.universe, &key)
                .map_err(|e| CatalogError::Count {
                    code: code.clone(),
                    source: Box::new(e),
                })?;
            debug!(%code, cardinality = count, "counted grouping");
            entries.push((key, count));
        }
        CardinalityCatalog::from_entries(self.universe, entries)
    }
}
