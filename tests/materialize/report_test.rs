//! Tests for batch capacity comparisons and their rendering.

use rollup::attribute::AttributeUniverse;
use rollup::catalog::CardinalityCatalog;
use rollup::materialize::{batch_report, BatchReport};
use rollup::workload::Workload;
use std::sync::Arc;

fn rollup_fixture() -> (Arc<CardinalityCatalog>, Workload) {
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let workload = Workload::parse_list(&universe, "AB, A, C, A").unwrap();
    let catalog =
        CardinalityCatalog::from_codes(universe, [("A", 10), ("AB", 1000), ("C", 1000)]).unwrap();
    (Arc::new(catalog), workload)
}

fn report() -> BatchReport {
    let (catalog, workload) = rollup_fixture();
    batch_report(&catalog, &workload, &[1, 2]).unwrap()
}

#[test]
fn test_runs_follow_capacity_order() {
    let report = report();
    let capacities: Vec<usize> = report.runs.iter().map(|r| r.capacity).collect();
    assert_eq!(capacities, vec![1, 2]);
    assert_eq!(report.workload, vec!["AB", "A", "C", "A"]);
}

#[test]
fn test_capacity_one_thrashes() {
    let report = report();
    let run = report.run(1).unwrap();

    // C ties AB at 1000 and evicts the earlier AB; the final A is then
    // computed directly and evicts itself.
    assert_eq!(run.cumulative_io, 3010);
    assert_eq!(run.hits, 1);
    assert_eq!(run.misses, 3);
    assert_eq!(run.evictions, 2);
    assert_eq!(run.materialized, vec!["C"]);
    assert_eq!(run.steps[2].evicted.as_deref(), Some("AB"));
    assert_eq!(run.steps[3].evicted.as_deref(), Some("A"));
}

#[test]
fn test_capacity_two_matches_direct_replay() {
    let report = report();
    let run = report.run(2).unwrap();
    assert_eq!(run.cumulative_io, 4000);
    assert_eq!(run.materialized, vec!["AB", "C"]);
    assert!(report.run(3).is_none());
}

#[test]
fn test_text_rendering() {
    insta::assert_snapshot!(report().to_string(), @r"
    workload (4 queries): AB, A, C, A

    capacity = 1
      total io:     3010
      hits/misses:  1/3
      evictions:    2
      materialized: C

    capacity = 2
      total io:     4000
      hits/misses:  2/2
      evictions:    0
      materialized: AB, C
    ");
}

#[test]
fn test_json_shape() {
    let value = serde_json::to_value(report()).unwrap();

    assert!(value.get("catalog_fingerprint").is_none());
    assert_eq!(value["runs"][1]["cumulative_io"], 4000);
    assert_eq!(value["runs"][1]["steps"][1]["hit"], true);
    assert_eq!(value["runs"][1]["steps"][1]["source"], "AB");
    assert_eq!(value["runs"][1]["steps"][3]["cumulative_io"], 4000);
    assert!(value["runs"][1]["steps"][2].get("evicted").is_none());
}

#[test]
fn test_fingerprint_is_reported() {
    let (catalog, workload) = rollup_fixture();
    let fingerprint = catalog.fingerprint().unwrap();
    let report = batch_report(&catalog, &workload, &[2])
        .unwrap()
        .with_fingerprint(fingerprint.clone());

    assert_eq!(report.catalog_fingerprint.as_deref(), Some(fingerprint.as_str()));
    assert!(report.to_string().contains(&format!("catalog: {fingerprint}")));
}
