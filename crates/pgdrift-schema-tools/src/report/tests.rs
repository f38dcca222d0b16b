//! Tests for the report renderer

use pgdrift_parser::parse_schema;

use crate::compare::SchemaComparator;

use super::{ReportConfig, ReportGenerator, Verbosity};

fn report_for(source: &str, target: &str, config: ReportConfig) -> String {
    let source = parse_schema(source).schema;
    let target = parse_schema(target).schema;
    let diff = SchemaComparator::new().compare(&source, &target).unwrap();
    ReportGenerator::with_config(config).generate(&diff)
}

#[test]
fn test_summary_counts() {
    let report = report_for(
        "CREATE TABLE gone (id int); CREATE TABLE t (a int);",
        "CREATE TABLE t (a int, b int); CREATE TABLE fresh (id int);",
        ReportConfig::new(),
    );
    assert!(report.contains("Schema comparison report"));
    assert!(report.contains("Tables added:    1"));
    assert!(report.contains("Tables removed:  1"));
    assert!(report.contains("Tables modified: 1"));
    assert!(report.contains("critical: 1"));
    assert!(report.contains("warning: 2"));
}

#[test]
fn test_no_differences_footer() {
    let report = report_for(
        "CREATE TABLE t (a int);",
        "CREATE TABLE t (a int);",
        ReportConfig::new(),
    );
    assert!(report.contains("No differences found"));
    assert!(!report.contains("Table t"));
}

#[test]
fn test_detail_lines() {
    let report = report_for(
        "CREATE TABLE t (n int);",
        "CREATE TABLE t (n text);",
        ReportConfig::new(),
    );
    assert!(report.contains("Table t"));
    assert!(report.contains("Column type changed: n (int -> text)"));
}

#[test]
fn test_added_table_is_a_single_line() {
    let report = report_for("", "CREATE TABLE fresh (id int, n int);", ReportConfig::new());
    assert!(report.contains("Table fresh"));
    assert!(report.contains("Table added"));
    // no per-column detail for a brand-new table
    assert!(!report.contains("Column added"));
}

#[test]
fn test_summary_verbosity_omits_details() {
    let report = report_for(
        "CREATE TABLE t (n int);",
        "CREATE TABLE t (n text);",
        ReportConfig::new().with_verbosity(Verbosity::Summary),
    );
    assert!(!report.contains("Table t"));
    assert!(report.contains("critical: 1"));
}

#[test]
fn test_icons_can_be_disabled() {
    let config = ReportConfig::new().without_icons();
    let report = report_for("CREATE TABLE t (n int);", "CREATE TABLE t (n text);", config);
    assert!(!report.contains('\u{2717}'));

    let report = report_for(
        "CREATE TABLE t (n int);",
        "CREATE TABLE t (n text);",
        ReportConfig::new(),
    );
    assert!(report.contains('\u{2717}'));
}

#[test]
fn test_markdown_format() {
    let report = report_for(
        "CREATE TABLE t (n int);",
        "CREATE TABLE t (n text);",
        ReportConfig::new().markdown(),
    );
    assert!(report.contains("# Schema comparison report"));
    assert!(report.contains("## t"));
    assert!(report.contains("- Tables added:"));
    // markdown never carries ANSI escapes
    assert!(!report.contains('\x1b'));
}

#[test]
fn test_color_codes_only_when_enabled() {
    let plain = report_for(
        "CREATE TABLE t (n int);",
        "CREATE TABLE t (n text);",
        ReportConfig::new(),
    );
    assert!(!plain.contains('\x1b'));

    let colored = report_for(
        "CREATE TABLE t (n int);",
        "CREATE TABLE t (n text);",
        ReportConfig::new().with_color(),
    );
    assert!(colored.contains("\x1b[31m"));
}

#[test]
fn test_group_by_severity_orders_critical_first() {
    let report = report_for(
        "CREATE TABLE t (a int DEFAULT 1, b int);",
        "CREATE TABLE t (a int DEFAULT 2, b text);",
        ReportConfig::new().grouped_by_severity(),
    );
    let type_line = report.find("Column type changed").unwrap();
    let default_line = report.find("Column default changed").unwrap();
    assert!(type_line < default_line);
}

#[test]
fn test_max_width_truncates_lines() {
    let report = report_for(
        "CREATE TABLE extremely_long_table_name_for_truncation (a int);",
        "CREATE TABLE extremely_long_table_name_for_truncation (a int, very_long_column_name_indeed text DEFAULT 'some long default value');",
        ReportConfig::new().with_max_width(40),
    );
    for line in report.lines() {
        assert!(line.chars().count() <= 40, "line too long: {line}");
    }
    assert!(report.contains("..."));
}

#[test]
fn test_verbose_adds_severity_words() {
    let report = report_for(
        "CREATE TABLE t (n int);",
        "CREATE TABLE t (n text);",
        ReportConfig::new().with_verbosity(Verbosity::Verbose),
    );
    assert!(report.contains("[critical]"));
}
