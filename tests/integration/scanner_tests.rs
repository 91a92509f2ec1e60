use crate::common::*;
use dbmigrate::scanner::{tuple_key, KeyTuple};
use dbmigrate::{Connection, DuckDbConnection, MigrationError, TableScanner};

const NONE: &[&str] = &[];

fn db(setup: &str) -> DuckDbConnection {
    let conn = DuckDbConnection::open_in_memory("scan").unwrap();
    conn.execute_batch(setup).unwrap();
    conn
}

#[test]
fn test_primary_rows_match_filtered_row_count() {
    let conn = db(
        "CREATE TABLE t (a INTEGER, b VARCHAR, v INTEGER, PRIMARY KEY (a, b));
         INSERT INTO t VALUES (1, 'x', 0), (1, 'y', 0), (2, 'x', 1), (10, 'x', 1);",
    );
    let schema = conn.load_schema().unwrap();
    let table = schema.table("t").unwrap();

    let all = TableScanner::new(&conn, table, NONE, NONE).unwrap();
    let rows = all.primary_rows().unwrap();
    assert_eq!(rows.len() as u64, conn.count_rows("t").unwrap());
    assert!(rows.iter().all(|(key, tuple)| *key == tuple_key(tuple)));

    let filtered = TableScanner::new(&conn, table, &["v = 1"], NONE).unwrap();
    let rows = filtered.primary_rows().unwrap();
    assert_eq!(rows.keys().collect::<Vec<_>>(), vec!["2\tx", "10\tx"]);
}

#[test]
fn test_several_filters_select_their_intersection() {
    let conn = db(
        "CREATE TABLE foo (id INTEGER PRIMARY KEY, code INTEGER);
         INSERT INTO foo VALUES (1, 1), (2, 2), (3, 3);",
    );
    let schema = conn.load_schema().unwrap();
    let scanner = TableScanner::new(
        &conn,
        schema.table("foo").unwrap(),
        &["id = 1 OR id = 2", "code = 2"],
        NONE,
    )
    .unwrap();

    let expected = conn
        .query("SELECT CAST(count(*) AS VARCHAR) FROM foo WHERE (id = 1 OR id = 2) AND code = 2")
        .unwrap();
    let rows = scanner.primary_rows().unwrap();
    assert_eq!(expected, vec![vec![text("1")]]);
    assert_eq!(rows.keys().collect::<Vec<_>>(), vec!["2"]);
}

#[test]
fn test_primary_rows_in_native_key_order() {
    let conn = db(
        "CREATE TABLE t (id INTEGER PRIMARY KEY);
         INSERT INTO t VALUES (10), (9), (100), (1);",
    );
    let schema = conn.load_schema().unwrap();
    let scanner = TableScanner::new(&conn, schema.table("t").unwrap(), NONE, NONE).unwrap();
    let keys: Vec<String> = scanner.primary_rows().unwrap().keys().cloned().collect();
    // Numeric order, not text order
    assert_eq!(keys, vec!["1", "9", "10", "100"]);
}

#[test]
fn test_equals_is_symmetric() {
    let pair = DbPair::new(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, a VARCHAR, b INTEGER);",
        "CREATE TABLE t (id INTEGER PRIMARY KEY, b INTEGER, a VARCHAR);",
    )
    .unwrap();
    let old_schema = pair.old.load_schema().unwrap();
    let new_schema = pair.new.load_schema().unwrap();
    let old = TableScanner::new(&pair.old, old_schema.table("t").unwrap(), NONE, NONE).unwrap();
    let new = TableScanner::new(&pair.new, new_schema.table("t").unwrap(), NONE, NONE).unwrap();

    // Column order does not matter
    assert!(old.equals(&new));
    assert!(new.equals(&old));
    assert!(old.mismatch_reason(&new).is_none());
}

#[test]
fn test_inequality_is_symmetric() {
    let pair = DbPair::new(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, a VARCHAR);",
        "CREATE TABLE t (id INTEGER PRIMARY KEY, a VARCHAR, b INTEGER);",
    )
    .unwrap();
    let old_schema = pair.old.load_schema().unwrap();
    let new_schema = pair.new.load_schema().unwrap();
    let old = TableScanner::new(&pair.old, old_schema.table("t").unwrap(), NONE, NONE).unwrap();
    let new = TableScanner::new(&pair.new, new_schema.table("t").unwrap(), NONE, NONE).unwrap();

    assert!(!old.equals(&new));
    assert!(!new.equals(&old));
    assert!(old.mismatch_reason(&new).unwrap().contains('b'));
}

#[test]
fn test_scanner_requires_primary_key() {
    let conn = db("CREATE TABLE heap (v INTEGER);");
    let schema = conn.load_schema().unwrap();
    let result = TableScanner::new(&conn, schema.table("heap").unwrap(), NONE, NONE);
    assert!(matches!(result, Err(MigrationError::NoPrimaryKey { .. })));
}

#[test]
fn test_records_for_keys_returns_requested_page() {
    let conn = db(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, v VARCHAR);
         INSERT INTO t SELECT i, 'v' || CAST(i AS VARCHAR) FROM range(1, 8) r(i);",
    );
    let schema = conn.load_schema().unwrap();
    let scanner = TableScanner::new(&conn, schema.table("t").unwrap(), NONE, NONE)
        .unwrap()
        .with_page_size(3);

    let tuples: Vec<KeyTuple> = scanner.primary_rows().unwrap().into_values().collect();
    assert_eq!(scanner.page_count(tuples.len()), 3);

    let second = scanner.records_for_keys(&tuples, 1).unwrap();
    let ids: Vec<Option<String>> = second.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![text("4"), text("5"), text("6")]);
    assert_eq!(second[0]["v"], text("v4"));

    assert_eq!(scanner.records_for_keys(&tuples, 2).unwrap().len(), 1);
    assert!(scanner.records_for_keys(&tuples, 3).unwrap().is_empty());
}

#[test]
fn test_build_where_quotes_values() {
    let conn = db("CREATE TABLE t (a VARCHAR, b VARCHAR, PRIMARY KEY (a, b));");
    let schema = conn.load_schema().unwrap();
    let scanner = TableScanner::new(&conn, schema.table("t").unwrap(), NONE, NONE).unwrap();

    let tuples = vec![vec![text("o'k"), text("1")], vec![text("x"), text("2")]];
    assert_eq!(
        scanner.build_where(&tuples),
        "((\"a\" = 'o''k' AND \"b\" = '1') OR (\"a\" = 'x' AND \"b\" = '2'))"
    );
    assert_eq!(scanner.build_where(&[]), "FALSE");
}
