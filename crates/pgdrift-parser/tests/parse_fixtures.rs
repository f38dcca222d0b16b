//! Fixture schemas must parse without a single diagnostic

use pgdrift_core::{ColumnConstraintKind, TableConstraintKind, TableKind};
use pgdrift_parser::parse_schema;

#[test]
fn film_rental_schema_parses_cleanly() {
    let result = parse_schema(include_str!("fixtures/film_rental.sql"));
    assert!(result.errors.is_empty(), "errors: {:#?}", result.errors);
    assert_eq!(result.schema.tables.len(), 14);

    let film = result.schema.table("film").unwrap();
    assert_eq!(film.column("rental_rate").unwrap().data_type, "numeric(4,2)");
    assert_eq!(
        film.column("rating").unwrap().default_expr(),
        Some("'G'::mpaa_rating")
    );
    assert_eq!(film.column("special_features").unwrap().data_type, "text[]");

    let film_actor = result.schema.table("film_actor").unwrap();
    let pk = film_actor
        .table_constraints()
        .find(|c| matches!(c.kind, TableConstraintKind::PrimaryKey { .. }))
        .unwrap();
    assert_eq!(pk.name.as_deref(), Some("film_actor_pkey"));

    // every table except country carries at least one foreign key
    let rental = result.schema.table("rental").unwrap();
    assert_eq!(rental.referenced_tables().len(), 3);
}

#[test]
fn multi_tenant_schema_parses_cleanly() {
    let result = parse_schema(include_str!("fixtures/multi_tenant.sql"));
    assert!(result.errors.is_empty(), "errors: {:#?}", result.errors);
    assert_eq!(result.schema.tables.len(), 10);

    let users = result.schema.table("users").unwrap();
    let unique = users
        .table_constraints()
        .find(|c| matches!(c.kind, TableConstraintKind::Unique { .. }))
        .unwrap();
    match &unique.kind {
        TableConstraintKind::Unique { nulls_distinct, .. } => {
            assert_eq!(*nulls_distinct, Some(false));
        }
        _ => unreachable!(),
    }

    let tasks = result.schema.table("tasks").unwrap();
    assert!(tasks.column("search").unwrap().constraints.iter().any(|c| {
        matches!(c.kind, ColumnConstraintKind::GeneratedExpr { stored: true, .. })
    }));
    // self-reference
    assert!(tasks.referenced_tables().contains(&"tasks"));

    let audit = result.schema.table("audit_log").unwrap();
    assert_eq!(audit.kind, TableKind::Regular);
    assert!(audit.partition_by.is_some());

    let reservations = result.schema.table("room_reservations").unwrap();
    assert!(
        reservations
            .table_constraints()
            .any(|c| matches!(c.kind, TableConstraintKind::Exclude { .. }))
    );
}
