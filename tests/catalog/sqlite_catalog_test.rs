//! Catalogs counted from SQLite tables.

use rollup::attribute::{Attribute, AttributeUniverse};
use rollup::catalog::{CardinalitySource, CatalogBuilder, CatalogError, SqliteSource};
use rollup::dataset::{ColumnSpec, SyntheticTable};
use rollup::random::seeded_rng;
use rusqlite::Connection;

fn hand_table() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "
        CREATE TABLE t (A INTEGER, B INTEGER, C INTEGER);
        INSERT INTO t VALUES (1, 1, 1);
        INSERT INTO t VALUES (1, 2, 1);
        INSERT INTO t VALUES (2, 1, 1);
        INSERT INTO t VALUES (2, 1, 2);
        INSERT INTO t VALUES (1, 1, 1);
        ",
    )
    .unwrap();
    conn
}

#[test]
fn test_exact_counts_from_rows() {
    let conn = hand_table();
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let source = SqliteSource::new(&conn, "t");
    let catalog = CatalogBuilder::new(universe, &source).build().unwrap();

    let counts: Vec<(String, u64)> = catalog
        .entries()
        .into_iter()
        .map(|e| (e.code, e.cardinality))
        .collect();
    let expected: Vec<(String, u64)> = [
        ("A", 2),
        ("B", 2),
        ("C", 2),
        ("AB", 3),
        ("AC", 3),
        ("BC", 3),
        ("ABC", 4),
    ]
    .into_iter()
    .map(|(c, n)| (c.to_string(), n))
    .collect();
    assert_eq!(counts, expected);
}

#[test]
fn test_named_columns_are_queried() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "
        CREATE TABLE sales (region TEXT, product TEXT);
        INSERT INTO sales VALUES ('north', 'tea');
        INSERT INTO sales VALUES ('north', 'coffee');
        INSERT INTO sales VALUES ('south', 'tea');
        ",
    )
    .unwrap();
    let universe = AttributeUniverse::new(vec![
        Attribute::new('r', "region"),
        Attribute::new('p', "product"),
    ])
    .unwrap();
    let source = SqliteSource::new(&conn, "sales");

    let rp = universe.parse("rp").unwrap();
    let r = universe.parse("r").unwrap();
    assert_eq!(source.distinct_count(&universe, &rp).unwrap(), 3);
    assert_eq!(source.distinct_count(&universe, &r).unwrap(), 2);
}

#[test]
fn test_generated_table_is_monotonic_and_bounded() {
    let mut conn = Connection::open_in_memory().unwrap();
    let domains = [3u32, 4, 5];
    let table = SyntheticTable::new(
        "testGroupby",
        ['A', 'B', 'C']
            .into_iter()
            .zip(domains)
            .map(|(symbol, domain)| ColumnSpec {
                attribute: Attribute::named(symbol),
                domain,
            })
            .collect(),
    )
    .unwrap();
    let rows = table
        .generate(&mut conn, 400, &mut seeded_rng(Some(21)))
        .unwrap();

    let universe = table.universe().unwrap();
    let source = SqliteSource::new(&conn, "testGroupby");
    let catalog = CatalogBuilder::new(universe, &source).build().unwrap();
    assert!(catalog.is_complete());

    for key in catalog.keys() {
        let card = catalog.cardinality(&key).unwrap();
        let product: u64 = key.positions().map(|p| u64::from(domains[p])).product();
        assert!(card >= 1);
        assert!(card <= product.min(rows));
    }
}

#[test]
fn test_missing_table_fails_build() {
    let conn = Connection::open_in_memory().unwrap();
    let universe = AttributeUniverse::from_symbols("AB").unwrap();
    let source = SqliteSource::new(&conn, "absent");
    let result = CatalogBuilder::new(universe, &source).build();

    match result {
        Err(CatalogError::Count { code, source }) => {
            assert_eq!(code, "A");
            assert!(matches!(*source, CatalogError::Sqlite(_)));
        }
        other => panic!("expected a count failure, got {:?}", other),
    }
}

#[test]
fn test_build_for_counts_workload_keys() {
    let conn = hand_table();
    let universe = AttributeUniverse::from_symbols("ABC").unwrap();
    let keys = ["BC", "A", "BC"].map(|c| universe.parse(c).unwrap());
    let source = SqliteSource::new(&conn, "t");
    let catalog = CatalogBuilder::new(universe, &source).build_for(keys).unwrap();

    let universe = catalog.universe();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.cardinality(&universe.parse("A").unwrap()), Some(2));
    assert_eq!(catalog.cardinality(&universe.parse("BC").unwrap()), Some(3));
    assert_eq!(catalog.cardinality(&universe.parse("AB").unwrap()), None);
}
