//! Tests for catalog construction over static sources.

use rollup::attribute::{AttributeUniverse, GroupingKey};
use rollup::catalog::{
    CardinalityCatalog, CardinalitySource, CatalogBuilder, CatalogError, CatalogResult,
    StaticSource,
};
use std::cell::Cell;

/// Counts how often the builder asks for a cardinality.
struct CountingSource {
    inner: StaticSource,
    calls: Cell<usize>,
}

impl CardinalitySource for CountingSource {
    fn distinct_count(
        &self,
        universe: &AttributeUniverse,
        key: &GroupingKey,
    ) -> CatalogResult<u64> {
        self.calls.set(self.calls.get() + 1);
        self.inner.distinct_count(universe, key)
    }
}

fn abc_source() -> StaticSource {
    StaticSource::new()
        .with("A", 10)
        .with("B", 50)
        .with("C", 100)
        .with("AB", 400)
        .with("AC", 900)
        .with("BC", 2000)
        .with("ABC", 5000)
}

#[test]
fn test_build_counts_every_subset() {
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let source = CountingSource {
        inner: abc_source(),
        calls: Cell::new(0),
    };
    let catalog = CatalogBuilder::new(universe, &source).build().unwrap();

    assert_eq!(source.calls.get(), 7);
    assert_eq!(catalog.len(), 7);
    assert!(catalog.is_complete());
    let codes: Vec<String> = catalog.entries().into_iter().map(|e| e.code).collect();
    assert_eq!(codes, vec!["A", "B", "C", "AB", "AC", "BC", "ABC"]);
}

#[test]
fn test_full_catalog_is_monotonic() {
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let catalog = CatalogBuilder::new(universe, &abc_source()).build().unwrap();

    let keys = catalog.keys();
    for sub in &keys {
        for sup in &keys {
            if sub.is_subset_of(sup) {
                assert!(catalog.cardinality(sub) <= catalog.cardinality(sup));
            }
        }
    }
}

#[test]
fn test_non_monotonic_source_fails_build() {
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let source = abc_source().with("BC", 20);
    let result = CatalogBuilder::new(universe, &source).build();
    assert!(matches!(result, Err(CatalogError::NotMonotonic { .. })));
}

#[test]
fn test_missing_count_aborts_whole_build() {
    let universe = AttributeUniverse::from_symbols("ABCD").unwrap();
    let result = CatalogBuilder::new(universe, &abc_source()).build();

    match result {
        Err(CatalogError::Count { code, source }) => {
            assert_eq!(code, "D");
            assert!(matches!(*source, CatalogError::MissingCardinality(_)));
        }
        other => panic!("expected a count failure, got {:?}", other),
    }
}

#[test]
fn test_build_for_only_counts_requested_keys() {
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let keys: Vec<GroupingKey> = ["AB", "C", "AB", "A"]
        .iter()
        .map(|c| universe.parse(c).unwrap())
        .collect();
    let source = CountingSource {
        inner: abc_source(),
        calls: Cell::new(0),
    };
    let catalog = CatalogBuilder::new(universe, &source).build_for(keys).unwrap();

    assert_eq!(source.calls.get(), 3);
    assert!(!catalog.is_complete());
    let codes: Vec<String> = catalog.entries().into_iter().map(|e| e.code).collect();
    assert_eq!(codes, vec!["A", "C", "AB"]);
}

#[test]
fn test_from_entries_rejects_foreign_keys() {
    let universe = AttributeUniverse::from_symbols("AB").unwrap();
    let foreign = GroupingKey::from_positions([2]).unwrap();
    let result = CardinalityCatalog::from_entries(universe, [(foreign, 4)]);
    assert!(matches!(result, Err(CatalogError::Key(_))));
}
