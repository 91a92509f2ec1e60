use crate::common::*;
use dbmigrate::apply::Applier;
use dbmigrate::{Connection, DdlOptions, Migrator};

const OLD: &str = "
    CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR);
    CREATE TABLE legacy (id INTEGER PRIMARY KEY);
";

const NEW: &str = "
    CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR, email VARCHAR);
    CREATE TABLE tags (id INTEGER PRIMARY KEY, label VARCHAR NOT NULL);
    CREATE VIEW user_names AS SELECT name FROM users;
";

/// Present on both sides so neither setup script is empty
const KEPT: &str = "CREATE TABLE kept (id INTEGER PRIMARY KEY);";

fn position(sqls: &[String], prefix: &str) -> usize {
    sqls.iter()
        .position(|s| s.starts_with(prefix))
        .unwrap_or_else(|| panic!("no statement starting with {:?} in {:#?}", prefix, sqls))
}

#[test]
fn test_statements_in_execution_safe_order() {
    let pair = DbPair::new(OLD, NEW).unwrap();
    let sqls = Migrator::new().ddl(&pair.old, &pair.new, &DdlOptions::default()).unwrap();

    let create = position(&sqls, "CREATE TABLE \"tags\"");
    let alter = position(&sqls, "ALTER TABLE \"users\" ADD COLUMN \"email\" VARCHAR");
    let drop = position(&sqls, "DROP TABLE \"legacy\"");
    let view = position(&sqls, "CREATE VIEW \"user_names\"");
    assert!(create < alter && alter < drop && drop < view, "{:#?}", sqls);
    assert!(sqls[create].contains("\"label\" VARCHAR NOT NULL"));
}

#[test]
fn test_views_can_be_left_out() {
    let pair = DbPair::new(OLD, NEW).unwrap();
    let options = DdlOptions {
        include_views: false,
        ..Default::default()
    };
    let sqls = Migrator::new().ddl(&pair.old, &pair.new, &options).unwrap();
    assert!(!sqls.iter().any(|s| s.contains("VIEW")));
    assert_eq!(sqls.len(), 3);
}

#[test]
fn test_excluded_tables_are_not_touched() {
    let pair = DbPair::new(OLD, NEW).unwrap();
    let options = DdlOptions {
        excludes: vec!["^tags$".to_string(), "legacy".to_string()],
        include_views: false,
        ..Default::default()
    };
    let sqls = Migrator::new().ddl(&pair.old, &pair.new, &options).unwrap();
    assert_eq!(sqls, vec!["ALTER TABLE \"users\" ADD COLUMN \"email\" VARCHAR"]);
}

#[test]
fn test_applied_ddl_invalidates_cached_schema() {
    let pair = DbPair::new(OLD, NEW).unwrap();
    let mut migrator = Migrator::new();
    let options = DdlOptions::default();

    let sqls = migrator.ddl(&pair.old, &pair.new, &options).unwrap();
    let report = Applier::default().apply_ddl(&mut migrator, &pair.old, &sqls).unwrap();
    assert_eq!(report.executed, sqls.len());

    assert!(migrator.ddl(&pair.old, &pair.new, &options).unwrap().is_empty());
    assert!(migrator.schema(&pair.old).unwrap().has_table("tags"));
}

#[test]
fn test_stale_cache_until_invalidated() {
    let pair = DbPair::new(OLD, NEW).unwrap();
    let mut migrator = Migrator::new();
    let options = DdlOptions {
        include_views: false,
        ..Default::default()
    };

    let sqls = migrator.ddl(&pair.old, &pair.new, &options).unwrap();
    for sql in &sqls {
        pair.old.execute(sql).unwrap();
    }
    // Executed behind the migrator's back: the snapshot is stale
    assert_eq!(migrator.ddl(&pair.old, &pair.new, &options).unwrap(), sqls);

    migrator.invalidate(pair.old.id());
    assert!(migrator.ddl(&pair.old, &pair.new, &options).unwrap().is_empty());
}

#[test]
fn test_check_mode_runs_nothing() {
    let pair = DbPair::new(OLD, NEW).unwrap();
    let mut migrator = Migrator::new();
    let sqls = migrator.ddl(&pair.old, &pair.new, &DdlOptions::default()).unwrap();

    let report = Applier::new(true, false).apply_ddl(&mut migrator, &pair.old, &sqls).unwrap();
    assert_eq!(report.executed, 0);
    assert_eq!(report.skipped, sqls.len());
    assert!(!pair.old.load_schema().unwrap().has_table("tags"));
}

#[test]
fn test_referenced_tables_are_created_first() {
    let new = "
        CREATE TABLE kept (id INTEGER PRIMARY KEY);
        CREATE TABLE b_parent (id INTEGER PRIMARY KEY);
        CREATE TABLE a_child (id INTEGER PRIMARY KEY, pid INTEGER REFERENCES b_parent (id));
    ";
    let pair = DbPair::new(KEPT, new).unwrap();
    let mut migrator = Migrator::new();
    let sqls = migrator.ddl(&pair.old, &pair.new, &DdlOptions::default()).unwrap();

    let parent = position(&sqls, "CREATE TABLE \"b_parent\"");
    let child = position(&sqls, "CREATE TABLE \"a_child\"");
    assert!(parent < child, "{:#?}", sqls);

    let report = Applier::default().apply_ddl(&mut migrator, &pair.old, &sqls).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.executed, sqls.len());
    assert!(migrator.ddl(&pair.old, &pair.new, &DdlOptions::default()).unwrap().is_empty());
}

#[test]
fn test_referencing_tables_are_dropped_first() {
    let old = "
        CREATE TABLE kept (id INTEGER PRIMARY KEY);
        CREATE TABLE a_parent (id INTEGER PRIMARY KEY);
        CREATE TABLE b_child (id INTEGER PRIMARY KEY, pid INTEGER REFERENCES a_parent (id));
    ";
    let pair = DbPair::new(old, KEPT).unwrap();
    let mut migrator = Migrator::new();
    let sqls = migrator.ddl(&pair.old, &pair.new, &DdlOptions::default()).unwrap();
    assert_eq!(sqls, vec!["DROP TABLE \"b_child\"", "DROP TABLE \"a_parent\""]);

    let report = Applier::default().apply_ddl(&mut migrator, &pair.old, &sqls).unwrap();
    assert!(report.is_clean());
    assert_eq!(pair.old.load_schema().unwrap().table_names(), vec!["kept"]);
}
