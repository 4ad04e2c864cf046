//! Invariant checks for the materialization cache over randomized workloads.

use rollup::attribute::{AttributeUniverse, GroupingKey};
use rollup::catalog::{CardinalityCatalog, CatalogBuilder, StaticSource};
use rollup::materialize::{CacheError, MaterializationCache, ReplayReport};
use rollup::random::seeded_rng;
use rollup::workload::{Sampling, Workload};
use std::sync::Arc;

/// Full ABCD catalog where a grouping's cardinality is the product of its
/// domains, capped at a row count. Monotonic by construction.
fn product_catalog() -> Arc<CardinalityCatalog> {
    let universe = AttributeUniverse::from_symbols("ABCD").unwrap();
    let domains = [10u64, 100, 1000, 10000];
    let rows = 750_000u64;

    let source: StaticSource = universe
        .all_keys()
        .into_iter()
        .map(|key| {
            let product = key.positions().map(|p| domains[p]).product::<u64>();
            (universe.code(&key), product.min(rows))
        })
        .collect();
    Arc::new(CatalogBuilder::new(universe, &source).build().unwrap())
}

fn random_workload(catalog: &CardinalityCatalog, seed: u64, len: usize) -> Workload {
    let mut rng = seeded_rng(Some(seed));
    Workload::sample(&catalog.keys(), len, Sampling::Uniform, &mut rng).unwrap()
}

#[test]
fn test_capacity_bound_holds_after_every_request() {
    let catalog = product_catalog();
    for capacity in 1..=6 {
        let workload = random_workload(&catalog, capacity as u64, 200);
        let mut cache = MaterializationCache::new(Arc::clone(&catalog), capacity).unwrap();
        for &query in workload.queries() {
            cache.serve(query).unwrap();
            assert!(cache.materialized().len() <= capacity);
        }
    }
}

#[test]
fn test_materialized_query_hits_at_its_own_cardinality() {
    let catalog = product_catalog();
    for seed in 0..20 {
        let workload = random_workload(&catalog, seed, 100);
        let mut cache = MaterializationCache::new(Arc::clone(&catalog), 3).unwrap();
        for &query in workload.queries() {
            let was_materialized = cache.is_materialized(&query);
            let outcome = cache.serve(query).unwrap();
            if was_materialized {
                assert!(outcome.hit);
                assert_eq!(outcome.source, query);
                assert_eq!(Some(outcome.cost), catalog.cardinality(&query));
            }
        }
    }
}

#[test]
fn test_charges_follow_hit_and_miss_rules() {
    let catalog = product_catalog();
    let workload = random_workload(&catalog, 99, 300);
    let mut cache = MaterializationCache::new(Arc::clone(&catalog), 4).unwrap();

    let mut previous_io = 0;
    for &query in workload.queries() {
        let before: Vec<GroupingKey> = cache.materialized();
        let outcome = cache.serve(query).unwrap();

        if outcome.hit {
            assert!(query.is_subset_of(&outcome.source));
            assert!(before.contains(&outcome.source));
            // First superset in insertion order.
            let first = before.iter().find(|m| query.is_subset_of(m)).copied();
            assert_eq!(first, Some(outcome.source));
            assert_eq!(Some(outcome.cost), catalog.cardinality(&outcome.source));
            assert_eq!(cache.materialized(), before);
        } else {
            assert!(!before.iter().any(|m| query.is_subset_of(m)));
            assert_eq!(Some(outcome.cost), catalog.cardinality(&query));
        }

        assert!(cache.cumulative_io() >= previous_io);
        assert_eq!(cache.cumulative_io(), previous_io + outcome.cost);
        previous_io = cache.cumulative_io();
    }
}

#[test]
fn test_evicted_entry_has_minimal_cardinality() {
    let catalog = product_catalog();
    let workload = random_workload(&catalog, 5, 300);
    let mut cache = MaterializationCache::new(Arc::clone(&catalog), 2).unwrap();

    for &query in workload.queries() {
        let mut candidates: Vec<GroupingKey> = cache.materialized();
        let outcome = cache.serve(query).unwrap();
        if let Some(victim) = outcome.evicted {
            candidates.push(query);
            let smallest = candidates
                .iter()
                .filter_map(|k| catalog.cardinality(k))
                .min()
                .unwrap();
            assert_eq!(catalog.cardinality(&victim), Some(smallest));
            assert!(!cache.is_materialized(&victim));
        }
    }
}

#[test]
fn test_replay_is_deterministic() {
    let catalog = product_catalog();
    let workload = random_workload(&catalog, 42, 150);

    for capacity in [1, 2, 4, 6] {
        let first = ReplayReport::run(&catalog, &workload, capacity).unwrap();
        let second = ReplayReport::run(&catalog, &workload, capacity).unwrap();
        assert_eq!(first.cumulative_io, second.cumulative_io);
        assert_eq!(first.materialized, second.materialized);
        assert_eq!(first, second);
    }
}

#[test]
fn test_key_outside_universe_is_rejected() {
    let catalog = product_catalog();
    let mut cache = MaterializationCache::new(Arc::clone(&catalog), 2).unwrap();
    let outside = GroupingKey::from_positions([0, 5]).unwrap();

    assert!(matches!(cache.serve(outside), Err(CacheError::Key(_))));
    assert_eq!(cache.cumulative_io(), 0);
    assert!(cache.materialized().is_empty());
}
