//! Tests for the schema comparator

use pgdrift_core::{Column, Schema, StorageKind, TableDef, TableElement};
use pgdrift_parser::parse_schema;

use super::{CompareConfig, DiffKind, SchemaComparator, Severity};

fn schema_of(sql: &str) -> Schema {
    let result = parse_schema(sql);
    assert!(result.errors.is_empty(), "fixture errors: {:?}", result.errors);
    result.schema
}

fn diff_sql(source: &str, target: &str) -> super::SchemaDiff {
    SchemaComparator::new()
        .compare(&schema_of(source), &schema_of(target))
        .unwrap()
}

#[test]
fn test_self_diff_is_empty() {
    let sql = include_str!("../../../pgdrift-parser/tests/fixtures/film_rental.sql");
    let diff = diff_sql(sql, sql);
    assert!(diff.is_empty(), "unexpected entries: {:?}", diff.entries().collect::<Vec<_>>());
    assert_eq!(diff.total_diffs(), 0);
    assert!(diff.table_diffs.iter().all(|t| !t.modified));
}

#[test]
fn test_self_diff_of_multi_tenant_schema_is_empty() {
    let sql = include_str!("../../../pgdrift-parser/tests/fixtures/multi_tenant.sql");
    let diff = diff_sql(sql, sql);
    assert!(diff.is_empty(), "unexpected entries: {:?}", diff.entries().collect::<Vec<_>>());
}

#[test]
fn test_added_column() {
    let diff = diff_sql(
        "CREATE TABLE users (id integer PRIMARY KEY, name varchar(100) NOT NULL);",
        "CREATE TABLE users (id integer PRIMARY KEY, name varchar(100) NOT NULL, email varchar(255));",
    );
    assert_eq!(diff.table_diffs.len(), 1);
    let td = &diff.table_diffs[0];
    assert_eq!(td.added_columns.len(), 1);
    assert_eq!(td.added_columns[0].name, "email");
    assert_eq!(td.added_columns[0].data_type, "varchar(255)");
    let entry = &td.entries[0];
    assert_eq!(entry.kind, DiffKind::ColumnAdded);
    assert_eq!(entry.severity, Severity::Warning);
    assert_eq!(entry.new.as_deref(), Some("varchar(255)"));
}

#[test]
fn test_removed_column_is_critical() {
    let diff = diff_sql(
        "CREATE TABLE t (a int, b int);",
        "CREATE TABLE t (a int);",
    );
    let td = &diff.table_diffs[0];
    assert_eq!(td.removed_columns.len(), 1);
    assert_eq!(td.entries[0].kind, DiffKind::ColumnRemoved);
    assert_eq!(td.entries[0].severity, Severity::Critical);
}

#[test]
fn test_nullability_and_default_changes() {
    let diff = diff_sql(
        "CREATE TABLE t (x int);",
        "CREATE TABLE t (x int NOT NULL DEFAULT 0);",
    );
    let td = &diff.table_diffs[0];
    assert_eq!(td.modified_columns.len(), 1);
    let cd = &td.modified_columns[0];
    assert_eq!(cd.nullable_change, Some((true, false)));
    assert_eq!(cd.default_change, Some((None, Some("0".to_string()))));

    let kinds: Vec<DiffKind> = td.entries.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&DiffKind::ColumnNullableChanged));
    assert!(kinds.contains(&DiffKind::ColumnDefaultChanged));

    let nullable = td
        .entries
        .iter()
        .find(|e| e.kind == DiffKind::ColumnNullableChanged)
        .unwrap();
    assert_eq!(nullable.severity, Severity::Warning);
    assert_eq!(nullable.old.as_deref(), Some("NULL"));
    assert_eq!(nullable.new.as_deref(), Some("NOT NULL"));

    let default = td
        .entries
        .iter()
        .find(|e| e.kind == DiffKind::ColumnDefaultChanged)
        .unwrap();
    assert_eq!(default.severity, Severity::Info);
    assert_eq!(default.old.as_deref(), Some("(none)"));
}

#[test]
fn test_type_alias_produces_no_diff() {
    let diff = diff_sql("CREATE TABLE t (n int4);", "CREATE TABLE t (n integer);");
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_timestamptz_spellings_produce_no_diff() {
    let diff = diff_sql(
        "CREATE TABLE t (ts timestamp(3) with time zone);",
        "CREATE TABLE t (ts timestamptz(3));",
    );
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_type_change_is_critical() {
    let diff = diff_sql("CREATE TABLE t (n int);", "CREATE TABLE t (n text);");
    let entry = &diff.table_diffs[0].entries[0];
    assert_eq!(entry.kind, DiffKind::ColumnTypeChanged);
    assert_eq!(entry.severity, Severity::Critical);
}

#[test]
fn test_cast_suffix_in_default_produces_no_diff() {
    let diff = diff_sql(
        "CREATE TABLE t (s review_status DEFAULT 'DRAFT');",
        "CREATE TABLE t (s review_status DEFAULT 'DRAFT'::review_status);",
    );
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_inline_pk_equals_table_level_pk() {
    let diff = diff_sql(
        "CREATE TABLE t (id int PRIMARY KEY);",
        "CREATE TABLE t (id int, PRIMARY KEY (id));",
    );
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_composite_key_matches_inline_columns() {
    // one table-level UNIQUE over N columns matches N single-column
    // inline UNIQUE constraints covering it
    let diff = diff_sql(
        "CREATE TABLE t (a int UNIQUE, b int UNIQUE);",
        "CREATE TABLE t (a int, b int, UNIQUE (a, b));",
    );
    assert_eq!(diff.total_diffs(), 0, "{:?}", diff.entries().collect::<Vec<_>>());
}

#[test]
fn test_constraint_added_and_removed_severities() {
    let diff = diff_sql(
        "CREATE TABLE t (a int, CONSTRAINT old_check CHECK (a > 0));",
        "CREATE TABLE t (a int, CONSTRAINT new_unique UNIQUE (a));",
    );
    let td = &diff.table_diffs[0];
    assert_eq!(td.added_constraints.len(), 1);
    assert_eq!(td.removed_constraints.len(), 1);
    let added = td
        .entries
        .iter()
        .find(|e| e.kind == DiffKind::ConstraintAdded)
        .unwrap();
    assert_eq!(added.severity, Severity::Info);
    assert_eq!(added.element.as_deref(), Some("new_unique"));
    let removed = td
        .entries
        .iter()
        .find(|e| e.kind == DiffKind::ConstraintRemoved)
        .unwrap();
    assert_eq!(removed.severity, Severity::Warning);
}

#[test]
fn test_same_name_same_kind_is_a_modification() {
    let diff = diff_sql(
        "CREATE TABLE t (a int, CONSTRAINT t_check CHECK (a > 0));",
        "CREATE TABLE t (a int, CONSTRAINT t_check CHECK (a > 10));",
    );
    let td = &diff.table_diffs[0];
    assert_eq!(td.modified_constraints.len(), 1);
    assert!(td.added_constraints.is_empty());
    assert!(td.removed_constraints.is_empty());
    assert_eq!(td.entries[0].kind, DiffKind::ConstraintModified);
}

#[test]
fn test_ignore_constraint_names_matches_by_shape() {
    let source = "CREATE TABLE t (a int, CONSTRAINT one CHECK (a > 0));";
    let target = "CREATE TABLE t (a int, CONSTRAINT two CHECK (a > 0));";

    let diff = diff_sql(source, target);
    assert_ne!(diff.total_diffs(), 0);

    let comparator =
        SchemaComparator::with_config(CompareConfig::new().ignoring_constraint_names());
    let diff = comparator
        .compare(&schema_of(source), &schema_of(target))
        .unwrap();
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_unnamed_table_constraint_entry_name() {
    let diff = diff_sql(
        "CREATE TABLE t (a int);",
        "CREATE TABLE t (a int, CHECK (a > 0));",
    );
    let entry = &diff.table_diffs[0].entries[0];
    assert_eq!(entry.element.as_deref(), Some("(unnamed)"));
}

#[test]
fn test_promoted_constraint_entry_uses_column_name() {
    let diff = diff_sql(
        "CREATE TABLE t (a int);",
        "CREATE TABLE t (a int UNIQUE);",
    );
    let entry = &diff.table_diffs[0].entries[0];
    assert_eq!(entry.kind, DiffKind::ConstraintAdded);
    assert_eq!(entry.element.as_deref(), Some("a"));
}

#[test]
fn test_added_and_removed_tables() {
    let diff = diff_sql(
        "CREATE TABLE gone (id int);",
        "CREATE TABLE fresh (id int);",
    );
    assert_eq!(diff.removed_tables, vec!["gone".to_string()]);
    assert_eq!(diff.added_tables, vec!["fresh".to_string()]);
    let counts = diff.counts();
    assert_eq!(counts.tables_added, 1);
    assert_eq!(counts.tables_removed, 1);
    assert_eq!(counts.critical, 1);
    assert_eq!(counts.warning, 1);
}

#[test]
fn test_add_remove_antisymmetry() {
    let a = "CREATE TABLE x (id int); CREATE TABLE shared (id int);";
    let b = "CREATE TABLE y (id int); CREATE TABLE shared (id int);";
    let ab = diff_sql(a, b);
    let ba = diff_sql(b, a);
    assert_eq!(ab.added_tables, ba.removed_tables);
    assert_eq!(ab.removed_tables, ba.added_tables);
}

#[test]
fn test_persistence_change_is_critical() {
    let diff = diff_sql(
        "CREATE TABLE t (id int);",
        "CREATE UNLOGGED TABLE t (id int);",
    );
    let td = &diff.table_diffs[0];
    assert!(td.type_changed);
    assert_eq!(td.entries[0].kind, DiffKind::TableTypeChanged);
    assert_eq!(td.entries[0].severity, Severity::Critical);
}

#[test]
fn test_tablespace_change_is_info() {
    let diff = diff_sql(
        "CREATE TABLE t (id int);",
        "CREATE TABLE t (id int) TABLESPACE fast;",
    );
    let td = &diff.table_diffs[0];
    assert!(td.tablespace_changed);
    assert_eq!(td.entries[0].kind, DiffKind::TablespaceChanged);
    assert_eq!(td.entries[0].severity, Severity::Info);
}

#[test]
fn test_include_exclude_patterns() {
    let source = "CREATE TABLE app_users (id int); CREATE TABLE tmp_scratch (id int);";
    let target = "CREATE TABLE app_users (id int, extra int); CREATE TABLE tmp_other (id int);";

    let comparator = SchemaComparator::with_config(
        CompareConfig::new().include("app_").exclude("tmp_"),
    );
    let diff = comparator
        .compare(&schema_of(source), &schema_of(target))
        .unwrap();
    assert!(diff.added_tables.is_empty());
    assert!(diff.removed_tables.is_empty());
    assert_eq!(diff.table_diffs.len(), 1);
    assert_eq!(diff.table_diffs[0].table, "app_users");
}

#[test]
fn test_case_sensitivity_option() {
    let source = "CREATE TABLE t (Col int);";
    let target = "CREATE TABLE t (col int);";
    assert_eq!(diff_sql(source, target).total_diffs(), 0);

    let comparator = SchemaComparator::with_config(CompareConfig::new().case_sensitive());
    let diff = comparator
        .compare(&schema_of(source), &schema_of(target))
        .unwrap();
    // the column counts as removed and re-added
    assert_ne!(diff.total_diffs(), 0);
}

#[test]
fn test_collation_sentinel_counts_as_absent() {
    let mut source = Schema::public();
    let mut table = TableDef::new("t");
    let column = Column::new("name", "text");
    table.elements.push(TableElement::Column(column));
    source.push_table(table).unwrap();

    let mut target = Schema::public();
    let mut table = TableDef::new("t");
    let mut column = Column::new("name", "text");
    column.collation = Some("default".to_string());
    table.elements.push(TableElement::Column(column));
    target.push_table(table).unwrap();

    let diff = SchemaComparator::new().compare(&source, &target).unwrap();
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_one_sided_storage_is_ignored() {
    // file DDL omits storage, introspection always reports it
    let mut source = Schema::public();
    let mut table = TableDef::new("t");
    table
        .elements
        .push(TableElement::Column(Column::new("blob", "bytea")));
    source.push_table(table).unwrap();

    let mut target = Schema::public();
    let mut table = TableDef::new("t");
    let mut column = Column::new("blob", "bytea");
    column.storage = StorageKind::Extended;
    table.elements.push(TableElement::Column(column));
    target.push_table(table).unwrap();

    let diff = SchemaComparator::new().compare(&source, &target).unwrap();
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_two_sided_storage_difference_counts() {
    let diff = diff_sql(
        "CREATE TABLE t (blob bytea STORAGE PLAIN);",
        "CREATE TABLE t (blob bytea STORAGE EXTENDED);",
    );
    assert_eq!(diff.table_diffs[0].entries[0].kind, DiffKind::ColumnStorageChanged);
}

#[test]
fn test_fk_details_are_significant() {
    let diff = diff_sql(
        "CREATE TABLE t (a int, FOREIGN KEY (a) REFERENCES p (id) ON DELETE CASCADE);",
        "CREATE TABLE t (a int, FOREIGN KEY (a) REFERENCES p (id) ON DELETE RESTRICT);",
    );
    assert_eq!(diff.table_diffs[0].added_constraints.len(), 1);
    assert_eq!(diff.table_diffs[0].removed_constraints.len(), 1);
}

#[test]
fn test_fk_default_action_matches_explicit_no_action() {
    let diff = diff_sql(
        "CREATE TABLE t (a int, FOREIGN KEY (a) REFERENCES p (id));",
        "CREATE TABLE t (a int, FOREIGN KEY (a) REFERENCES p (id) ON DELETE NO ACTION MATCH SIMPLE);",
    );
    assert_eq!(diff.total_diffs(), 0);
}

#[test]
fn test_exclusion_constraints_compare_element_wise() {
    let sql_a = "CREATE TABLE t (r tsrange, EXCLUDE USING gist (r WITH &&));";
    let sql_b = "CREATE TABLE t (r tsrange, EXCLUDE USING gist (r WITH =));";
    assert_eq!(diff_sql(sql_a, sql_a).total_diffs(), 0);
    assert_ne!(diff_sql(sql_a, sql_b).total_diffs(), 0);
}

#[test]
fn test_partition_difference_is_flagged_not_detailed() {
    let diff = diff_sql(
        "CREATE TABLE m (ts timestamptz, v int) PARTITION BY RANGE (ts);",
        "CREATE TABLE m (ts timestamptz, v int) PARTITION BY HASH (v);",
    );
    let td = &diff.table_diffs[0];
    assert!(td.entries.iter().any(|e| e.kind == DiffKind::PartitionChanged));
}

#[test]
fn test_storage_params_difference_is_flagged() {
    let diff = diff_sql(
        "CREATE TABLE t (id int) WITH (fillfactor = 70);",
        "CREATE TABLE t (id int) WITH (fillfactor = 90);",
    );
    assert!(
        diff.table_diffs[0]
            .entries
            .iter()
            .any(|e| e.kind == DiffKind::StorageParamsChanged)
    );
}
