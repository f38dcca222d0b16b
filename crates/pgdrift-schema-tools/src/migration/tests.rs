//! Tests for the dependency sorter and migration generator

use pgdrift_core::{Schema, TableDef};
use pgdrift_parser::parse_schema;

use crate::compare::SchemaComparator;

use super::{
    MigrationConfig, MigrationGenerator, creation_order, quote_ident, unquote_ident,
};

fn schema_of(sql: &str) -> Schema {
    let result = parse_schema(sql);
    assert!(result.errors.is_empty(), "fixture errors: {:?}", result.errors);
    result.schema
}

fn migrate(source: &str, target: &str) -> super::SqlMigration {
    let diff = SchemaComparator::new()
        .compare(&schema_of(source), &schema_of(target))
        .unwrap();
    MigrationGenerator::new().generate(&diff).unwrap()
}

// Dependency sorter

fn tables_of(schema: &Schema) -> Vec<&TableDef> {
    schema.tables.iter().collect()
}

#[test]
fn test_sorter_orders_dependencies_first() {
    let schema = schema_of(
        "CREATE TABLE c (id int, b_id int REFERENCES b (id));
         CREATE TABLE b (id int, a_id int REFERENCES a (id));
         CREATE TABLE a (id int);",
    );
    let plan = creation_order(&tables_of(&schema));
    assert!(!plan.has_cycles);
    assert_eq!(plan.order, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
}

#[test]
fn test_sorter_is_stable_for_independent_tables() {
    let schema = schema_of(
        "CREATE TABLE one (id int);
         CREATE TABLE two (id int);
         CREATE TABLE three (id int);",
    );
    let plan = creation_order(&tables_of(&schema));
    assert_eq!(
        plan.order,
        vec!["one".to_string(), "two".to_string(), "three".to_string()]
    );
}

#[test]
fn test_sorter_ignores_self_references() {
    let schema = schema_of("CREATE TABLE t (id int PRIMARY KEY, parent_id int REFERENCES t (id));");
    let plan = creation_order(&tables_of(&schema));
    assert!(!plan.has_cycles);
    assert_eq!(plan.order, vec!["t".to_string()]);
}

#[test]
fn test_sorter_ignores_external_references() {
    let schema = schema_of("CREATE TABLE t (id int, x_id int REFERENCES elsewhere (id));");
    let plan = creation_order(&tables_of(&schema));
    assert!(!plan.has_cycles);
    assert_eq!(plan.order.len(), 1);
}

#[test]
fn test_sorter_detects_cycles() {
    let schema = schema_of(
        "CREATE TABLE a (id int PRIMARY KEY, b_id int REFERENCES b (id));
         CREATE TABLE b (id int PRIMARY KEY, a_id int REFERENCES a (id));",
    );
    let plan = creation_order(&tables_of(&schema));
    assert!(plan.has_cycles);
    assert_eq!(plan.order.len(), 2);
}

#[test]
fn test_sorter_handles_diamonds() {
    let schema = schema_of(
        "CREATE TABLE d (id int, b_id int REFERENCES b (id), c_id int REFERENCES c (id));
         CREATE TABLE b (id int, a_id int REFERENCES a (id));
         CREATE TABLE c (id int, a_id int REFERENCES a (id));
         CREATE TABLE a (id int);",
    );
    let plan = creation_order(&tables_of(&schema));
    assert!(!plan.has_cycles);
    let position =
        |name: &str| plan.order.iter().position(|n| n == name).unwrap();
    assert!(position("a") < position("b"));
    assert!(position("a") < position("c"));
    assert!(position("b") < position("d"));
    assert!(position("c") < position("d"));
}

// Identifier quoting

#[test]
fn test_quote_ident_bare_cases() {
    assert_eq!(quote_ident("users"), "users");
    assert_eq!(quote_ident("User_Accounts2"), "User_Accounts2");
}

#[test]
fn test_quote_ident_quoted_cases() {
    assert_eq!(quote_ident(""), "\"\"");
    assert_eq!(quote_ident("2fast"), "\"2fast\"");
    assert_eq!(quote_ident("with space"), "\"with space\"");
    assert_eq!(quote_ident("has\"quote"), "\"has\"\"quote\"");
    // keywords are deliberately NOT quoted
    assert_eq!(quote_ident("select"), "select");
}

#[test]
fn test_quoting_round_trips() {
    for name in ["users", "2fast", "with space", "has\"quote", ""] {
        assert_eq!(unquote_ident(&quote_ident(name)), name);
    }
}

// Generator scenarios

#[test]
fn test_add_column_migration() {
    let migration = migrate(
        "CREATE TABLE users (id integer PRIMARY KEY, name varchar(100) NOT NULL);",
        "CREATE TABLE users (id integer PRIMARY KEY, name varchar(100) NOT NULL, email varchar(255));",
    );
    assert!(
        migration
            .forward_sql
            .contains("ALTER TABLE users ADD COLUMN email varchar(255);")
    );
    assert!(!migration.forward_sql.contains("DROP"));
    assert!(!migration.has_destructive_changes);
    assert_eq!(migration.statement_count, 1);
}

#[test]
fn test_default_is_set_before_not_null() {
    let migration = migrate(
        "CREATE TABLE t (x int);",
        "CREATE TABLE t (x int NOT NULL DEFAULT 0);",
    );
    let sql = &migration.forward_sql;
    let set_default = sql.find("SET DEFAULT 0").unwrap();
    let set_not_null = sql.find("SET NOT NULL").unwrap();
    assert!(set_default < set_not_null);
    // backfill hint for the nullable -> not-null transition
    assert!(sql.contains("-- UPDATE t SET x = 0 WHERE x IS NULL;"));
}

#[test]
fn test_fk_cycle_creates_tables_then_attaches_fks() {
    let migration = migrate(
        "",
        "CREATE TABLE a (id int PRIMARY KEY, b_id int REFERENCES b (id));
         CREATE TABLE b (id int PRIMARY KEY, a_id int REFERENCES a (id));",
    );
    let sql = &migration.forward_sql;
    assert!(!sql.contains("REFERENCES b (id)\n"), "FKs must not be inline:\n{sql}");

    let create_a = sql.find("CREATE TABLE a").unwrap();
    let create_b = sql.find("CREATE TABLE b").unwrap();
    let first_fk = sql.find("ADD FOREIGN KEY").unwrap();
    assert!(create_a < first_fk);
    assert!(create_b < first_fk);
    assert_eq!(sql.matches("ADD FOREIGN KEY").count(), 2);
    // 2 creates + 2 FK attachments
    assert_eq!(migration.statement_count, 4);
}

#[test]
fn test_acyclic_creates_inline_fks_in_order() {
    let migration = migrate(
        "",
        "CREATE TABLE child (id int, parent_id int REFERENCES parent (id));
         CREATE TABLE parent (id int PRIMARY KEY);",
    );
    let sql = &migration.forward_sql;
    let create_parent = sql.find("CREATE TABLE parent").unwrap();
    let create_child = sql.find("CREATE TABLE child").unwrap();
    assert!(create_parent < create_child);
    assert!(sql.contains("REFERENCES parent (id)"));
    assert!(!sql.contains("ADD FOREIGN KEY"));
}

#[test]
fn test_drop_table_migration() {
    let migration = migrate("CREATE TABLE legacy (id int);", "");
    assert!(
        migration
            .forward_sql
            .contains("DROP TABLE IF EXISTS legacy CASCADE;")
    );
    assert!(migration.has_destructive_changes);
    assert_eq!(migration.statement_count, 1);
}

#[test]
fn test_transaction_wrapping() {
    let migration = migrate("CREATE TABLE t (a int);", "CREATE TABLE t (a int, b int);");
    let sql = &migration.forward_sql;
    assert!(sql.contains("BEGIN;"));
    assert!(sql.trim_end().ends_with("COMMIT;"));

    let diff = SchemaComparator::new()
        .compare(
            &schema_of("CREATE TABLE t (a int);"),
            &schema_of("CREATE TABLE t (a int, b int);"),
        )
        .unwrap();
    let generator =
        MigrationGenerator::with_config(MigrationConfig::new().without_transactions());
    let migration = generator.generate(&diff).unwrap();
    assert!(!migration.forward_sql.contains("BEGIN;"));
}

#[test]
fn test_statement_count_ignores_comments_and_transaction_control() {
    let migration = migrate(
        "CREATE TABLE old_one (id int); CREATE TABLE t (a int);",
        "CREATE TABLE t (a int, b int);",
    );
    // one DROP TABLE plus one ADD COLUMN
    assert_eq!(migration.statement_count, 2);
}

#[test]
fn test_modification_order_within_table() {
    let migration = migrate(
        "CREATE TABLE t (gone int, x int, c int);",
        "CREATE TABLE t (x text, c int, fresh int);",
    );
    let sql = &migration.forward_sql;
    let drop_column = sql.find("DROP COLUMN").unwrap();
    let add_column = sql.find("ADD COLUMN").unwrap();
    let alter_type = sql.find("ALTER COLUMN x TYPE text").unwrap();
    assert!(drop_column < add_column);
    assert!(add_column < alter_type);
    assert!(migration.has_destructive_changes);
}

#[test]
fn test_constraint_drop_then_add() {
    let migration = migrate(
        "CREATE TABLE t (a int, CONSTRAINT c_old CHECK (a > 0));",
        "CREATE TABLE t (a int, CONSTRAINT c_new UNIQUE (a));",
    );
    let sql = &migration.forward_sql;
    let drop = sql.find("DROP CONSTRAINT IF EXISTS c_old").unwrap();
    let add = sql.find("ADD CONSTRAINT c_new UNIQUE (a)").unwrap();
    assert!(drop < add);
    assert!(migration.has_destructive_changes);
}

#[test]
fn test_modified_constraint_is_dropped_and_recreated() {
    let migration = migrate(
        "CREATE TABLE t (a int, CONSTRAINT t_check CHECK (a > 0));",
        "CREATE TABLE t (a int, CONSTRAINT t_check CHECK (a > 10));",
    );
    let sql = &migration.forward_sql;
    let drop = sql.find("DROP CONSTRAINT IF EXISTS t_check").unwrap();
    let add = sql.find("ADD CONSTRAINT t_check CHECK (a > 10)").unwrap();
    assert!(drop < add);
}

#[test]
fn test_inline_unique_addition_is_lifted() {
    let migration = migrate(
        "CREATE TABLE t (code text);",
        "CREATE TABLE t (code text UNIQUE);",
    );
    assert!(migration.forward_sql.contains("ADD UNIQUE (code);"));
}

#[test]
fn test_added_column_with_references_lifts_a_foreign_key() {
    let migration = migrate(
        "CREATE TABLE t (id int);",
        "CREATE TABLE t (id int, owner_id int REFERENCES users (id) ON DELETE CASCADE);",
    );
    let sql = &migration.forward_sql;
    assert!(sql.contains("ADD COLUMN owner_id int;"));
    assert!(
        sql.contains("ADD FOREIGN KEY (owner_id) REFERENCES users (id) ON DELETE CASCADE;")
    );
}

#[test]
fn test_safe_mode_comments_out_destructive_statements() {
    let diff = SchemaComparator::new()
        .compare(&schema_of("CREATE TABLE legacy (id int);"), &schema_of(""))
        .unwrap();
    let generator = MigrationGenerator::with_config(MigrationConfig::new().safe());
    let migration = generator.generate(&diff).unwrap();
    assert!(
        migration
            .forward_sql
            .contains("-- [safe mode] DROP TABLE IF EXISTS legacy CASCADE;")
    );
    assert!(migration.has_destructive_changes);
}

#[test]
fn test_schema_qualification() {
    let diff = SchemaComparator::new()
        .compare(&schema_of(""), &schema_of("CREATE TABLE t (id int);"))
        .unwrap();
    let generator =
        MigrationGenerator::with_config(MigrationConfig::new().with_schema("tenant_a"));
    let migration = generator.generate(&diff).unwrap();
    assert!(migration.forward_sql.contains("CREATE TABLE tenant_a.t"));
}

#[test]
fn test_type_change_carries_a_warning_comment() {
    let migration = migrate("CREATE TABLE t (n int);", "CREATE TABLE t (n text);");
    let sql = &migration.forward_sql;
    assert!(sql.contains("-- WARNING:"));
    assert!(sql.contains("ALTER TABLE t ALTER COLUMN n TYPE text;"));
}

#[test]
fn test_empty_diff_generates_no_statements() {
    let migration = migrate("CREATE TABLE t (a int);", "CREATE TABLE t (a int);");
    assert_eq!(migration.statement_count, 0);
    assert!(!migration.has_destructive_changes);
}

#[test]
fn test_create_table_round_trips_through_the_parser() {
    let sql = include_str!("../../../pgdrift-parser/tests/fixtures/multi_tenant.sql");
    let original = schema_of(sql);
    let generator = MigrationGenerator::new();

    let mut rendered = String::new();
    for table in &original.tables {
        rendered.push_str(&generator.create_table_sql(table, false));
        rendered.push('\n');
    }

    let reparsed = parse_schema(&rendered);
    assert!(reparsed.errors.is_empty(), "reparse errors: {:#?}", reparsed.errors);

    let diff = SchemaComparator::new()
        .compare(&original, &reparsed.schema)
        .unwrap();
    assert_eq!(
        diff.total_diffs(),
        0,
        "round-trip differences: {:#?}",
        diff.entries().collect::<Vec<_>>()
    );
}
