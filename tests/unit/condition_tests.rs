use dbmigrate::condition::{parse_condition, resolve_ignore_columns, TAUTOLOGY};
use dbmigrate::schema::{Column, Table};

fn orders() -> Table {
    Table::new("orders")
        .with_column(Column::new("id", "integer"))
        .with_column(Column::new("user_id", "integer"))
        .with_column(Column::new("status", "string").nullable())
        .with_primary_key(&["id"])
}

fn users() -> Table {
    Table::new("users")
        .with_column(Column::new("id", "integer"))
        .with_column(Column::new("name", "string"))
        .with_primary_key(&["id"])
}

#[test]
fn test_empty_fragment_list_is_tautology() {
    let none: &[&str] = &[];
    assert_eq!(parse_condition(&orders(), none, '"').unwrap(), TAUTOLOGY);
}

#[test]
fn test_fragment_for_other_table_never_leaks() {
    let fragments = ["users.name = 'bob'"];
    assert_eq!(parse_condition(&orders(), &fragments, '"').unwrap(), TAUTOLOGY);
    assert_eq!(
        parse_condition(&users(), &fragments, '"').unwrap(),
        "users.name = 'bob'"
    );
}

#[test]
fn test_each_table_gets_its_own_fragments() {
    let fragments = ["status = 'open'", "users.id > 10", "\"orders\".\"user_id\" < 5"];
    assert_eq!(
        parse_condition(&orders(), &fragments, '"').unwrap(),
        "(status = 'open') AND (\"orders\".\"user_id\" < 5)"
    );
    // `users.id` names users; bare `status` is unknown there
    assert_eq!(parse_condition(&users(), &fragments, '"').unwrap(), "users.id > 10");
}

#[test]
fn test_each_fragment_is_grouped_before_and() {
    let fragments = ["status = 'open' OR status IS NULL", "user_id = 7", "users.name = 'bob'"];
    assert_eq!(
        parse_condition(&orders(), &fragments, '"').unwrap(),
        "(status = 'open' OR status IS NULL) AND (user_id = 7)"
    );
}

#[test]
fn test_bare_column_shared_by_tables_applies_to_both() {
    let fragments = ["id <= 100"];
    assert_eq!(parse_condition(&orders(), &fragments, '"').unwrap(), "id <= 100");
    assert_eq!(parse_condition(&users(), &fragments, '"').unwrap(), "id <= 100");
}

#[test]
fn test_fragment_kept_when_any_identifier_matches() {
    let fragments = ["nothing = 1 OR status IS NULL"];
    assert_eq!(
        parse_condition(&orders(), &fragments, '"').unwrap(),
        "nothing = 1 OR status IS NULL"
    );
}

#[test]
fn test_ignore_entries_resolved_per_table() {
    let ignores = ["status", "users.name", "orders.id"];
    assert_eq!(resolve_ignore_columns(&orders(), &ignores), vec!["status"]);
    assert_eq!(resolve_ignore_columns(&users(), &ignores), vec!["name"]);
}
