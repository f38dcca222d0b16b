//! End-to-end pipeline tests: parse two DDL sources, diff them, and
//! check the generated migration and report against expectations.

use pgdrift_parser::parse_schema;
use pgdrift_schema_tools::{
    MigrationGenerator, ReportConfig, ReportGenerator, SchemaComparator, Severity,
};

const FILM_RENTAL: &str = include_str!("../../pgdrift-parser/tests/fixtures/film_rental.sql");
const MULTI_TENANT: &str = include_str!("../../pgdrift-parser/tests/fixtures/multi_tenant.sql");

#[test]
fn fixture_self_comparison_is_clean_end_to_end() {
    for fixture in [FILM_RENTAL, MULTI_TENANT] {
        let schema = parse_schema(fixture).schema;
        let diff = SchemaComparator::new().compare(&schema, &schema).unwrap();
        assert!(diff.is_empty());

        let migration = MigrationGenerator::new().generate(&diff).unwrap();
        assert_eq!(migration.statement_count, 0);
        assert!(!migration.has_destructive_changes);

        let report = ReportGenerator::new().generate(&diff);
        assert!(report.contains("No differences found"));
    }
}

#[test]
fn evolving_the_film_rental_schema() {
    // the kind of drift that accumulates between a DDL file and a
    // long-lived database: a widened column, a new column, a dropped
    // table, and a tightened nullability
    let evolved = FILM_RENTAL
        .replace("email varchar(50),", "email varchar(100),")
        .replace(
            "active boolean NOT NULL DEFAULT true,\n    username",
            "active boolean NOT NULL DEFAULT true,\n    phone varchar(20),\n    username",
        )
        .replace("return_date timestamptz,", "return_date timestamptz NOT NULL,");
    let evolved = strip_table(&evolved, "CREATE TABLE payment");

    let source = parse_schema(FILM_RENTAL).schema;
    let target = parse_schema(&evolved).schema;
    assert_eq!(source.tables.len(), 14);
    assert_eq!(target.tables.len(), 13);

    let diff = SchemaComparator::new().compare(&source, &target).unwrap();
    assert_eq!(diff.removed_tables, vec!["payment".to_string()]);
    assert!(diff.added_tables.is_empty());
    let counts = diff.counts();
    assert!(counts.critical >= 1);
    assert!(counts.warning >= 2);

    let migration = MigrationGenerator::new().generate(&diff).unwrap();
    let sql = &migration.forward_sql;
    assert!(sql.contains("DROP TABLE IF EXISTS payment CASCADE;"));
    assert!(sql.contains("ALTER TABLE staff ADD COLUMN phone varchar(20);"));
    assert!(sql.contains("ALTER TABLE customer ALTER COLUMN email TYPE varchar(100);"));
    assert!(sql.contains("ALTER TABLE rental ALTER COLUMN return_date SET NOT NULL;"));
    assert!(migration.has_destructive_changes);

    let report = ReportGenerator::new().generate(&diff);
    assert!(report.contains("Table payment"));
    assert!(report.contains("Table removed"));
    assert!(report.contains("Column added: phone"));
}

#[test]
fn bootstrap_migration_creates_all_tables_in_fk_order() {
    let source = parse_schema("").schema;
    let target = parse_schema(FILM_RENTAL).schema;
    let diff = SchemaComparator::new().compare(&source, &target).unwrap();
    assert_eq!(diff.added_tables.len(), 14);

    let migration = MigrationGenerator::new().generate(&diff).unwrap();
    let sql = &migration.forward_sql;
    assert_eq!(migration.statement_count, 14);
    assert!(!migration.has_destructive_changes);

    // FK targets precede their dependents
    let position = |needle: &str| sql.find(needle).unwrap_or_else(|| panic!("missing {needle}"));
    assert!(position("CREATE TABLE country") < position("CREATE TABLE city"));
    assert!(position("CREATE TABLE city") < position("CREATE TABLE address"));
    assert!(position("CREATE TABLE film") < position("CREATE TABLE inventory"));
    assert!(position("CREATE TABLE inventory") < position("CREATE TABLE rental"));
    assert!(position("CREATE TABLE rental") < position("CREATE TABLE payment"));

    // the bootstrap parses back to the target schema; comments and
    // transaction control are skipped by the parser
    let reparsed = parse_schema(sql);
    assert!(reparsed.errors.is_empty(), "errors: {:#?}", reparsed.errors);
    let round_trip = SchemaComparator::new()
        .compare(&target, &reparsed.schema)
        .unwrap();
    assert_eq!(
        round_trip.total_diffs(),
        0,
        "differences: {:#?}",
        round_trip.entries().collect::<Vec<_>>()
    );
}

#[test]
fn severity_gate_catches_destructive_drift() {
    let shrunk = strip_table(FILM_RENTAL, "CREATE TABLE payment");
    let source = parse_schema(FILM_RENTAL).schema;
    let target = parse_schema(&shrunk).schema;
    let diff = SchemaComparator::new().compare(&source, &target).unwrap();
    assert!(diff.has_severity(Severity::Critical));

    let report = ReportGenerator::with_config(ReportConfig::new().markdown()).generate(&diff);
    assert!(report.contains("## payment"));
}

/// Removes one CREATE TABLE statement (from its opening line through the
/// terminating semicolon) from a DDL source
fn strip_table(sql: &str, opening: &str) -> String {
    let start = sql.find(opening).expect("table not in fixture");
    let end = start + sql[start..].find(';').expect("unterminated statement") + 1;
    format!("{}{}", &sql[..start], &sql[end..])
}
