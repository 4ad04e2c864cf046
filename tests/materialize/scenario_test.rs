//! Reference replay scenarios over the {A, B, C} universe.

use rollup::attribute::AttributeUniverse;
use rollup::catalog::CardinalityCatalog;
use rollup::materialize::MaterializationCache;
use std::sync::Arc;

fn cache(entries: &[(&str, u64)], capacity: usize) -> MaterializationCache {
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let catalog = CardinalityCatalog::from_codes(universe, entries.iter().copied()).unwrap();
    MaterializationCache::new(Arc::new(catalog), capacity).unwrap()
}

#[test]
fn test_rollup_without_eviction() {
    let mut cache = cache(&[("A", 10), ("AB", 1000), ("C", 1000)], 2);

    let ab = cache.serve_code("AB").unwrap();
    assert!(!ab.hit);
    assert_eq!(ab.cost, 1000);
    assert_eq!(cache.materialized_codes(), vec!["AB"]);

    // Rolled up from AB, so charged AB's size rather than A's.
    let a = cache.serve_code("A").unwrap();
    assert!(a.hit);
    assert_eq!(a.cost, 1000);
    assert_eq!(cache.materialized_codes(), vec!["AB"]);

    let c = cache.serve_code("C").unwrap();
    assert!(!c.hit);
    assert_eq!(c.cost, 1000);
    assert_eq!(c.evicted, None);
    assert_eq!(cache.materialized_codes(), vec!["AB", "C"]);

    let a_again = cache.serve_code("A").unwrap();
    assert!(a_again.hit);
    assert_eq!(a_again.cost, 1000);

    assert_eq!(cache.cumulative_io(), 4000);
    assert_eq!(cache.materialized_codes(), vec!["AB", "C"]);
}

#[test]
fn test_smallest_cardinality_is_evicted() {
    let mut cache = cache(&[("A", 10), ("B", 100), ("C", 1000)], 2);

    let a = cache.serve_code("A").unwrap();
    assert!(!a.hit);
    assert_eq!(a.cost, 10);
    assert_eq!(cache.materialized_codes(), vec!["A"]);

    let b = cache.serve_code("B").unwrap();
    assert!(!b.hit);
    assert_eq!(b.cost, 100);
    assert_eq!(cache.materialized_codes(), vec!["A", "B"]);

    let c = cache.serve_code("C").unwrap();
    assert!(!c.hit);
    assert_eq!(c.cost, 1000);
    let universe = cache.catalog().universe().clone();
    assert_eq!(c.evicted.map(|k| universe.code(&k)).as_deref(), Some("A"));

    assert_eq!(cache.materialized_codes(), vec!["B", "C"]);
    assert_eq!(cache.cumulative_io(), 1110);
}
