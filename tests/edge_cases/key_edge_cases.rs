use crate::common::*;
use dbmigrate::{Connection, DmlOptions};

const PAIRS: &str = "CREATE TABLE pairs (a VARCHAR, b INTEGER, v VARCHAR, PRIMARY KEY (a, b));";

#[test]
fn test_composite_key_statements() {
    let pair = DbPair::new(
        &format!("{PAIRS} INSERT INTO pairs VALUES ('x', 1, 'p'), ('x', 2, 'q'), ('y', 1, 'r');"),
        &format!("{PAIRS} INSERT INTO pairs VALUES ('x', 1, 'P'), ('y', 1, 'r'), ('y', 2, 's');"),
    )
    .unwrap();
    let sqls = pair.dml("pairs", &DmlOptions::default()).unwrap();

    assert_eq!(kinds(&sqls), vec!["DELETE", "UPDATE", "INSERT"]);
    assert!(sqls[0].ends_with("DELETE FROM \"pairs\" WHERE (\"a\" = 'x' AND \"b\" = '2')"));
    assert!(sqls[1].ends_with("WHERE (\"a\" = 'x' AND \"b\" = '1')"));
    assert_eq!(
        sqls[2],
        "INSERT INTO \"pairs\" (\"a\", \"b\", \"v\") VALUES\n  ('y', '2', 's')"
    );

    pair.apply("pairs", &sqls).unwrap();
    assert!(pair.dml("pairs", &DmlOptions::default()).unwrap().is_empty());
}

#[test]
fn test_composite_key_pages() {
    let setup = |suffix: &str| {
        format!("{PAIRS} INSERT INTO pairs SELECT chr(CAST(97 + i % 3 AS INTEGER)), i, 'v{suffix}' FROM range(0, 20) t(i);")
    };
    let pair = DbPair::new(&setup("1"), &setup("2")).unwrap();
    let options = DmlOptions {
        page_size: 6,
        ..Default::default()
    };
    let sqls = pair.dml("pairs", &options).unwrap();
    assert_eq!(count_kind(&sqls, "UPDATE"), 20);

    pair.apply("pairs", &sqls).unwrap();
    assert!(pair.dml("pairs", &options).unwrap().is_empty());
}

#[test]
fn test_text_keys_with_quotes_and_unicode() {
    let table = "CREATE TABLE words (w VARCHAR PRIMARY KEY, n INTEGER);";
    let pair = DbPair::new(
        &format!("{table} INSERT INTO words VALUES ('o''clock', 1), ('naïve', 2), ('東京', 3);"),
        &format!("{table} INSERT INTO words VALUES ('o''clock', 10), ('東京', 3), ('🚀', 4);"),
    )
    .unwrap();
    let sqls = pair.dml("words", &DmlOptions::default()).unwrap();

    assert_eq!(kinds(&sqls), vec!["DELETE", "UPDATE", "INSERT"]);
    assert!(sqls[0].ends_with("WHERE (\"w\" = 'naïve')"));
    assert!(sqls[1].ends_with("WHERE (\"w\" = 'o''clock')"));

    pair.apply("words", &sqls).unwrap();
    assert_eq!(
        pair.old_rows("SELECT w FROM words ORDER BY n"),
        vec![vec![text("東京")], vec![text("🚀")], vec![text("o'clock")]]
    );
}

#[test]
fn test_reserved_and_spaced_identifiers() {
    let table = "CREATE TABLE \"order items\" (\"select\" INTEGER PRIMARY KEY, \"from\" VARCHAR);";
    let pair = DbPair::new(
        &format!("{table} INSERT INTO \"order items\" VALUES (1, 'a'), (2, 'b');"),
        &format!("{table} INSERT INTO \"order items\" VALUES (2, 'B'), (3, 'c');"),
    )
    .unwrap();
    let sqls = pair.dml("order items", &DmlOptions::default()).unwrap();
    assert_eq!(sqls.len(), 3);
    assert!(sqls[0].ends_with("DELETE FROM \"order items\" WHERE (\"select\" = '1')"));

    pair.apply("order items", &sqls).unwrap();
    assert!(pair.dml("order items", &DmlOptions::default()).unwrap().is_empty());
}

#[test]
fn test_empty_tables_on_both_sides() {
    let pair = DbPair::foo(&[], &[]).unwrap();
    assert!(pair.dml("foo", &DmlOptions::default()).unwrap().is_empty());
}

#[test]
fn test_ignoring_key_column_has_no_effect() {
    let pair = DbPair::foo(&[(1, 1), (2, 2)], &[(2, 3), (4, 4)]).unwrap();
    let plain = pair.dml("foo", &DmlOptions::default()).unwrap();
    let options = DmlOptions {
        ignores: vec!["id".to_string(), "foo.id".to_string()],
        ..Default::default()
    };
    assert_eq!(pair.dml("foo", &options).unwrap(), plain);
}

#[test]
fn test_ignore_every_value_column_suppresses_updates() {
    let pair = DbPair::foo(&[(1, 1), (2, 2)], &[(1, 10), (2, 20), (3, 30)]).unwrap();
    let options = DmlOptions {
        ignores: vec!["code".to_string()],
        ..Default::default()
    };
    let sqls = pair.dml("foo", &options).unwrap();
    assert_eq!(sqls, vec!["INSERT INTO \"foo\" (\"id\") VALUES\n  ('3')"]);

    pair.apply("foo", &sqls).unwrap();
    assert_eq!(pair.old.count_rows("foo").unwrap(), 3);
    assert_eq!(pair.old_rows("SELECT code FROM foo WHERE id = 3"), vec![vec![None]]);
}
