//! PostgreSQL schema introspection
//!
//! Builds the same `Schema` model the DDL parser builds, by reading
//! `pg_catalog` directly. Type names come from `format_type`, defaults
//! from `pg_get_expr` (usually cast-suffixed, which the normalizer
//! papers over), identity from `pg_attribute.attidentity`, storage from
//! `attstorage`, persistence from `pg_class.relpersistence`. Collation
//! and tablespace are materialized only when they differ from the
//! default. Queries are batched per schema, one round trip per catalog
//! family, never per table.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio_postgres::Client;

use pgdrift_core::{
    Column, ColumnConstraint, ColumnConstraintKind, FkAction, FkMatch, GeneratedKind,
    PartitionMethod, PartitionSpec, Persistence, Schema, SequenceOptions, StorageKind,
    TableConstraint, TableConstraintKind, TableDef, TableElement,
};
use pgdrift_parser::parse_schema;

/// Errors that can occur during introspection
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("schema model error: {0}")]
    Model(#[from] pgdrift_core::SchemaError),

    #[error("could not parse constraint definition '{0}'")]
    ConstraintDefinition(String),
}

/// Result type for introspection operations
pub type IntrospectResult<T> = std::result::Result<T, IntrospectError>;

/// Anything that can produce a schema model
#[async_trait]
pub trait SchemaSource {
    /// Loads the named schema
    async fn load_schema(&self, name: &str) -> IntrospectResult<Schema>;
}

/// Schema source backed by a live PostgreSQL connection
pub struct PostgresIntrospector<'a> {
    client: &'a Client,
}

impl<'a> PostgresIntrospector<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SchemaSource for PostgresIntrospector<'_> {
    async fn load_schema(&self, name: &str) -> IntrospectResult<Schema> {
        introspect_schema(self.client, name).await
    }
}

/// Introspects one schema into the shared model
#[tracing::instrument(skip(client))]
pub async fn introspect_schema(client: &Client, schema_name: &str) -> IntrospectResult<Schema> {
    let mut schema = Schema::new(schema_name);
    let mut tables: Vec<TableDef> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    // Tables: name, persistence, tablespace, storage parameters, and the
    // partition key for partitioned parents. Partition children are
    // skipped; their shape is owned by the parent.
    let table_rows = client
        .query(
            "SELECT c.relname,
                    c.relpersistence::text,
                    ts.spcname,
                    c.reloptions,
                    CASE WHEN c.relkind = 'p' THEN pg_get_partkeydef(c.oid) END AS partkey
             FROM pg_class c
             JOIN pg_namespace n ON n.oid = c.relnamespace
             LEFT JOIN pg_tablespace ts ON ts.oid = c.reltablespace
             WHERE n.nspname = $1
               AND c.relkind IN ('r', 'p')
               AND NOT c.relispartition
             ORDER BY c.relname",
            &[&schema_name],
        )
        .await?;

    for row in &table_rows {
        let name: String = row.get(0);
        let persistence: String = row.get(1);
        let tablespace: Option<String> = row.get(2);
        let reloptions: Option<Vec<String>> = row.get(3);
        let partkey: Option<String> = row.get(4);

        let mut table = TableDef::new(&name);
        table.persistence = match persistence.as_str() {
            "t" => Persistence::Temporary,
            "u" => Persistence::Unlogged,
            _ => Persistence::Normal,
        };
        table.tablespace = tablespace;
        if let Some(options) = reloptions {
            for option in options {
                match option.split_once('=') {
                    Some((key, value)) => table
                        .storage_params
                        .push((key.to_string(), value.to_string())),
                    None => table.storage_params.push((option, "true".to_string())),
                }
            }
        }
        if let Some(partkey) = partkey {
            table.partition_by = parse_partition_key(&partkey);
        }

        index_by_name.insert(name.clone(), tables.len());
        tables.push(table);
    }

    // Columns, in attnum order per table.
    let column_rows = client
        .query(
            "SELECT c.relname,
                    a.attname,
                    format_type(a.atttypid, a.atttypmod) AS data_type,
                    a.attnotnull,
                    pg_get_expr(d.adbin, d.adrelid) AS default_expr,
                    a.attidentity::text,
                    a.attstorage::text,
                    a.attgenerated::text,
                    CASE WHEN a.attcollation <> t.typcollation THEN co.collname END AS collname,
                    CASE a.attcompression::text
                        WHEN 'p' THEN 'pglz'
                        WHEN 'l' THEN 'lz4'
                    END AS compression
             FROM pg_attribute a
             JOIN pg_class c ON c.oid = a.attrelid
             JOIN pg_namespace n ON n.oid = c.relnamespace
             JOIN pg_type t ON t.oid = a.atttypid
             LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
             LEFT JOIN pg_collation co ON co.oid = a.attcollation
             WHERE n.nspname = $1
               AND c.relkind IN ('r', 'p')
               AND NOT c.relispartition
               AND a.attnum > 0
               AND NOT a.attisdropped
             ORDER BY c.relname, a.attnum",
            &[&schema_name],
        )
        .await?;

    // attnum -> name map per table, for decoding constraint column arrays
    let mut attnames: HashMap<String, HashMap<i16, String>> = HashMap::new();
    let attnum_rows = client
        .query(
            "SELECT c.relname, a.attnum, a.attname
             FROM pg_attribute a
             JOIN pg_class c ON c.oid = a.attrelid
             JOIN pg_namespace n ON n.oid = c.relnamespace
             WHERE n.nspname = $1 AND a.attnum > 0 AND NOT a.attisdropped",
            &[&schema_name],
        )
        .await?;
    for row in &attnum_rows {
        let table: String = row.get(0);
        let attnum: i16 = row.get(1);
        let attname: String = row.get(2);
        attnames.entry(table).or_default().insert(attnum, attname);
    }

    for row in &column_rows {
        let table_name: String = row.get(0);
        let Some(&table_index) = index_by_name.get(&table_name) else {
            continue;
        };
        let mut column = Column::new(row.get::<_, String>(1), row.get::<_, String>(2));
        let not_null: bool = row.get(3);
        let default_expr: Option<String> = row.get(4);
        let identity: String = row.get(5);
        let storage: String = row.get(6);
        let generated: String = row.get(7);
        column.collation = row.get(8);
        column.compression = row.get(9);

        column.storage = match storage.as_str() {
            "p" => StorageKind::Plain,
            "e" => StorageKind::External,
            "x" => StorageKind::Extended,
            "m" => StorageKind::Main,
            _ => StorageKind::Unset,
        };

        match identity.as_str() {
            "a" => column
                .constraints
                .push(ColumnConstraint::new(ColumnConstraintKind::GeneratedIdentity {
                    kind: GeneratedKind::Always,
                    sequence: SequenceOptions::default(),
                })),
            "d" => column
                .constraints
                .push(ColumnConstraint::new(ColumnConstraintKind::GeneratedIdentity {
                    kind: GeneratedKind::ByDefault,
                    sequence: SequenceOptions::default(),
                })),
            _ => {
                if let Some(expr) = default_expr {
                    if generated == "s" || generated == "v" {
                        column.constraints.push(ColumnConstraint::new(
                            ColumnConstraintKind::GeneratedExpr {
                                expr,
                                stored: generated == "s",
                            },
                        ));
                    } else {
                        column
                            .constraints
                            .push(ColumnConstraint::new(ColumnConstraintKind::Default { expr }));
                    }
                }
            }
        }

        if not_null {
            column
                .constraints
                .push(ColumnConstraint::new(ColumnConstraintKind::NotNull));
        }

        tables[table_index]
            .elements
            .push(TableElement::Column(column));
    }

    // Table constraints.
    let constraint_rows = client
        .query(
            "SELECT c.relname,
                    con.conname,
                    con.contype::text,
                    pg_get_constraintdef(con.oid) AS definition,
                    con.conkey,
                    con.confkey,
                    ref.relname AS ref_table,
                    con.confmatchtype::text,
                    con.confupdtype::text,
                    con.confdeltype::text
             FROM pg_constraint con
             JOIN pg_class c ON c.oid = con.conrelid
             JOIN pg_namespace n ON n.oid = c.relnamespace
             LEFT JOIN pg_class ref ON ref.oid = con.confrelid
             WHERE n.nspname = $1
               AND con.contype IN ('c', 'p', 'u', 'f', 'x')
             ORDER BY c.relname, con.conname",
            &[&schema_name],
        )
        .await?;

    for row in &constraint_rows {
        let table_name: String = row.get(0);
        let Some(&table_index) = index_by_name.get(&table_name) else {
            continue;
        };
        let name: String = row.get(1);
        let contype: String = row.get(2);
        let definition: String = row.get(3);
        let conkey: Option<Vec<i16>> = row.get(4);
        let confkey: Option<Vec<i16>> = row.get(5);
        let ref_table: Option<String> = row.get(6);
        let match_type: String = row.get(7);
        let on_update: String = row.get(8);
        let on_delete: String = row.get(9);

        let local_names = attnames.get(&table_name);
        let columns = decode_columns(conkey.as_deref(), local_names);

        let kind = match contype.as_str() {
            "p" => TableConstraintKind::PrimaryKey {
                columns,
                without_overlaps: false,
            },
            "u" => TableConstraintKind::Unique {
                columns,
                nulls_distinct: None,
                without_overlaps: false,
            },
            "c" => {
                let (expr, no_inherit) = parse_check_definition(&definition);
                TableConstraintKind::Check { expr, no_inherit }
            }
            "f" => {
                let ref_table = ref_table.unwrap_or_default();
                let ref_columns = decode_columns(confkey.as_deref(), attnames.get(&ref_table));
                TableConstraintKind::ForeignKey {
                    columns,
                    period: false,
                    ref_table,
                    ref_columns,
                    ref_period: false,
                    match_kind: match match_type.as_str() {
                        "f" => Some(FkMatch::Full),
                        "p" => Some(FkMatch::Partial),
                        _ => None,
                    },
                    on_delete: decode_fk_action(&on_delete),
                    on_update: decode_fk_action(&on_update),
                    set_columns_on_delete: Vec::new(),
                    set_columns_on_update: Vec::new(),
                }
            }
            "x" => parse_exclusion_definition(&definition)?,
            _ => continue,
        };

        let mut constraint = TableConstraint::new(kind);
        constraint.name = Some(name);
        tables[table_index]
            .elements
            .push(TableElement::Constraint(constraint));
    }

    // Inheritance (plain INHERITS, not partitioning).
    let inherits_rows = client
        .query(
            "SELECT child.relname, parent.relname
             FROM pg_inherits i
             JOIN pg_class child ON child.oid = i.inhrelid
             JOIN pg_class parent ON parent.oid = i.inhparent
             JOIN pg_namespace n ON n.oid = child.relnamespace
             WHERE n.nspname = $1 AND NOT child.relispartition
             ORDER BY child.relname, i.inhseqno",
            &[&schema_name],
        )
        .await?;
    for row in &inherits_rows {
        let child: String = row.get(0);
        let parent: String = row.get(1);
        if let Some(&table_index) = index_by_name.get(&child) {
            tables[table_index].inherits.push(parent);
        }
    }

    for table in tables {
        schema.push_table(table)?;
    }
    tracing::debug!(tables = schema.tables.len(), "schema introspected");
    Ok(schema)
}

fn decode_columns(
    attnums: Option<&[i16]>,
    names: Option<&HashMap<i16, String>>,
) -> Vec<String> {
    let (Some(attnums), Some(names)) = (attnums, names) else {
        return Vec::new();
    };
    attnums
        .iter()
        .filter_map(|n| names.get(n).cloned())
        .collect()
}

fn decode_fk_action(code: &str) -> Option<FkAction> {
    match code {
        "r" => Some(FkAction::Restrict),
        "c" => Some(FkAction::Cascade),
        "n" => Some(FkAction::SetNull),
        "d" => Some(FkAction::SetDefault),
        _ => None,
    }
}

/// `pg_get_constraintdef` spells checks as `CHECK ((expr)) [NO INHERIT]`
fn parse_check_definition(definition: &str) -> (String, bool) {
    let mut text = definition.trim();
    let no_inherit = text.ends_with("NO INHERIT");
    if no_inherit {
        text = text[..text.len() - "NO INHERIT".len()].trim_end();
    }
    let expr = text
        .strip_prefix("CHECK (")
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text);
    (expr.trim().to_string(), no_inherit)
}

/// Exclusion constraints come back as full SQL; reuse the DDL parser on
/// a synthetic statement rather than re-implementing that grammar here
fn parse_exclusion_definition(definition: &str) -> IntrospectResult<TableConstraintKind> {
    let wrapped = format!("CREATE TABLE __pgdrift_probe ({definition});");
    let result = parse_schema(&wrapped);
    let constraint = result
        .schema
        .tables
        .first()
        .and_then(|t| t.table_constraints().next())
        .map(|c| c.kind.clone());
    match constraint {
        Some(kind @ TableConstraintKind::Exclude { .. }) if result.errors.is_empty() => Ok(kind),
        _ => Err(IntrospectError::ConstraintDefinition(definition.to_string())),
    }
}

/// `pg_get_partkeydef` output, e.g. `RANGE (created_at)`
fn parse_partition_key(partkey: &str) -> Option<PartitionSpec> {
    let trimmed = partkey.trim();
    let (method, rest) = trimmed.split_once(' ')?;
    let method = match method.to_lowercase().as_str() {
        "range" => PartitionMethod::Range,
        "list" => PartitionMethod::List,
        "hash" => PartitionMethod::Hash,
        _ => return None,
    };
    let key = rest
        .trim()
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))?
        .trim()
        .to_string();
    Some(PartitionSpec { method, key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_definition_parsing() {
        let (expr, no_inherit) = parse_check_definition("CHECK ((price > 0))");
        assert_eq!(expr, "(price > 0)");
        assert!(!no_inherit);

        let (expr, no_inherit) = parse_check_definition("CHECK ((qty >= 1)) NO INHERIT");
        assert_eq!(expr, "(qty >= 1)");
        assert!(no_inherit);
    }

    #[test]
    fn test_exclusion_definition_parsing() {
        let kind = parse_exclusion_definition(
            "EXCLUDE USING gist (room WITH =, during WITH &&)",
        )
        .unwrap();
        match kind {
            TableConstraintKind::Exclude {
                method, elements, ..
            } => {
                assert_eq!(method.as_deref(), Some("gist"));
                assert_eq!(elements.len(), 2);
                assert_eq!(elements[1].operator, "&&");
            }
            other => panic!("expected exclusion constraint, got {other:?}"),
        }
    }

    #[test]
    fn test_partition_key_parsing() {
        let spec = parse_partition_key("RANGE (logged_at)").unwrap();
        assert_eq!(spec.method, PartitionMethod::Range);
        assert_eq!(spec.key, "logged_at");
        assert!(parse_partition_key("nonsense").is_none());
    }

    #[test]
    fn test_fk_action_codes() {
        assert_eq!(decode_fk_action("c"), Some(FkAction::Cascade));
        assert_eq!(decode_fk_action("n"), Some(FkAction::SetNull));
        // 'a' is NO ACTION, the default, and stays implicit
        assert_eq!(decode_fk_action("a"), None);
    }
}
