use clap::Parser;
use dbmigrate::cli::{Cli, Commands, DiffType};
use dbmigrate::config::RunConfig;
use std::path::PathBuf;

fn parse(args: &[&str]) -> Option<Cli> {
    let mut argv = vec!["dbmigrate"];
    argv.extend(args);
    Cli::try_parse_from(argv).ok()
}

#[test]
fn test_diff_defaults() {
    let cli = parse(&["diff", "old.duckdb", "new.duckdb"]).unwrap();
    assert!(!cli.verbose);
    assert!(cli.config.is_none());
    let Commands::Diff { old, new, diff_type, filters } = cli.command else {
        panic!("expected diff command");
    };
    assert_eq!(old, PathBuf::from("old.duckdb"));
    assert_eq!(new, PathBuf::from("new.duckdb"));
    assert_eq!(diff_type, DiffType::All);
    assert!(filters.include.is_empty() && filters.conditions.is_empty());
}

#[test]
fn test_diff_type_flag() {
    let cli = parse(&["diff", "a", "b", "--type", "dml"]).unwrap();
    let Commands::Diff { diff_type, .. } = cli.command else {
        panic!("expected diff command");
    };
    assert!(diff_type.includes_dml() && !diff_type.includes_ddl());

    assert!(parse(&["diff", "a", "b", "--type", "schema"]).is_none());
}

#[test]
fn test_repeated_filter_flags_accumulate() {
    let cli = parse(&[
        "migrate", "a", "b",
        "-i", "users", "-i", "orders",
        "-e", "_log$",
        "-w", "id > 10", "--where", "orders.status = 'open'",
        "-g", "updated_at",
    ])
    .unwrap();
    let Commands::Migrate { filters, check, force, .. } = cli.command else {
        panic!("expected migrate command");
    };
    assert!(!check && !force);
    assert_eq!(filters.include, vec!["users", "orders"]);
    assert_eq!(filters.exclude, vec!["_log$"]);
    assert_eq!(filters.conditions, vec!["id > 10", "orders.status = 'open'"]);
    assert_eq!(filters.ignore, vec!["updated_at"]);
}

#[test]
fn test_switches_reach_run_config() {
    let cli = parse(&[
        "migrate", "a", "b", "--check", "--force",
        "--no-delete", "--noview", "--page-size", "50", "-o", "200",
    ])
    .unwrap();
    let Commands::Migrate { filters, check, force, .. } = cli.command else {
        panic!("expected migrate command");
    };
    assert!(check && force);

    let mut config = RunConfig::default();
    filters.apply_to(&mut config);
    assert!(config.dml_types.insert && config.dml_types.update && !config.dml_types.delete);
    assert!(!config.include_views);
    assert_eq!(config.page_size, 50);
    assert_eq!(config.omit_length, 200);
}

#[test]
fn test_zero_page_size_rejected() {
    assert!(parse(&["diff", "a", "b", "--page-size", "0"]).is_none());
    assert!(parse(&["diff", "a", "b", "--omit", "abc"]).is_none());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["exec", "db.duckdb", "script.sql", "-v", "--config", "conf.json"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.config, Some(PathBuf::from("conf.json")));
    assert!(matches!(cli.command, Commands::Exec { check: false, .. }));
}

#[test]
fn test_missing_positional_is_rejected() {
    assert!(parse(&["migrate", "only-old.duckdb"]).is_none());
    assert!(parse(&[]).is_none());
}
