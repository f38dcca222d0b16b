//! Migration SQL generator
//!
//! Turns a `SchemaDiff` into an ordered forward-migration script. The
//! emission order is a hard contract: drops of removed tables, creations
//! of added tables in dependency order, then per-table modifications in
//! diff order, each with a fixed inner sequence (drop columns, add
//! columns, alter columns, drop constraints, add constraints, replace
//! modified constraints). When the FK graph of the tables to create is
//! cyclic, foreign keys are stripped from the CREATE statements and
//! attached afterwards with ALTER TABLE.

use thiserror::Error;

use pgdrift_core::{
    Column, ColumnConstraint, ColumnConstraintKind, Deferrability, ExcludeElement, FkAction,
    GeneratedKind, LikeClause, NullsOrder, Persistence, SequenceOptions, SortOrder, StorageKind,
    TableConstraint, TableConstraintKind, TableDef, TableElement,
};

use crate::compare::{ColumnDiff, ConstraintDiff, SchemaDiff, TableDiff};

use super::sorter::creation_order;

/// Errors that can occur during migration generation
#[derive(Debug, Error)]
pub enum MigrationError {
    /// An added table carried no definition to create it from
    #[error("added table '{0}' carries no definition")]
    MissingTableDefinition(String),
}

/// Result type for migration generation
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;

/// Configuration for migration generation
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Wrap the script in BEGIN/COMMIT
    pub use_transactions: bool,
    /// Add IF EXISTS to drops
    pub use_if_exists: bool,
    /// Emit the header and section comments
    pub add_comments: bool,
    /// Emit warning comments and backfill hints
    pub add_warnings: bool,
    /// Comment out destructive statements instead of emitting them live
    pub safe_mode: bool,
    /// Qualify table names with this schema
    pub schema_name: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            use_transactions: true,
            use_if_exists: true,
            add_comments: true,
            add_warnings: true,
            safe_mode: false,
            schema_name: None,
        }
    }
}

impl MigrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables the BEGIN/COMMIT wrapper
    pub fn without_transactions(mut self) -> Self {
        self.use_transactions = false;
        self
    }

    /// Disables IF EXISTS on drops
    pub fn without_if_exists(mut self) -> Self {
        self.use_if_exists = false;
        self
    }

    /// Disables all comments in the output
    pub fn without_comments(mut self) -> Self {
        self.add_comments = false;
        self.add_warnings = false;
        self
    }

    /// Comments out destructive statements
    pub fn safe(mut self) -> Self {
        self.safe_mode = true;
        self
    }

    /// Qualifies emitted table names with a schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = Some(schema.into());
        self
    }
}

/// A generated forward migration
#[derive(Debug, Clone)]
pub struct SqlMigration {
    /// The complete script
    pub forward_sql: String,
    /// Number of DDL statements, excluding comments and transaction
    /// control
    pub statement_count: usize,
    /// True when any DROP TABLE, DROP COLUMN, or DROP CONSTRAINT was
    /// emitted
    pub has_destructive_changes: bool,
}

/// Generator for forward-migration SQL
#[derive(Debug, Default)]
pub struct MigrationGenerator {
    config: MigrationConfig,
}

impl MigrationGenerator {
    /// Creates a generator with the default configuration
    pub fn new() -> Self {
        Self {
            config: MigrationConfig::default(),
        }
    }

    /// Creates a generator with the given configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Generates the forward migration for a diff
    pub fn generate(&self, diff: &SchemaDiff) -> MigrationResult<SqlMigration> {
        let mut out = Emitter::new(self.config.safe_mode);

        if self.config.add_comments {
            let counts = diff.counts();
            out.comment("Forward migration generated by pgdrift");
            out.comment(&format!(
                "Tables: {} added, {} removed, {} modified",
                counts.tables_added, counts.tables_removed, counts.tables_modified
            ));
            out.comment(&format!(
                "Differences: {} critical, {} warning, {} info",
                counts.critical, counts.warning, counts.info
            ));
            out.blank();
        }

        if self.config.use_transactions {
            out.control("BEGIN;");
            out.blank();
        }

        self.emit_drops(diff, &mut out);
        self.emit_creates(diff, &mut out)?;
        self.emit_modifications(diff, &mut out);

        if self.config.use_transactions {
            out.control("COMMIT;");
        }

        tracing::debug!(
            statements = out.statement_count,
            destructive = out.has_destructive,
            "migration generated"
        );
        Ok(SqlMigration {
            forward_sql: out.sql,
            statement_count: out.statement_count,
            has_destructive_changes: out.has_destructive,
        })
    }

    fn emit_drops(&self, diff: &SchemaDiff, out: &mut Emitter) {
        if diff.removed_tables.is_empty() {
            return;
        }
        if self.config.add_comments {
            out.comment("Removed tables");
        }
        for name in &diff.removed_tables {
            if self.config.add_warnings {
                out.comment(&format!("WARNING: dropping table '{name}' discards its data"));
            }
            let if_exists = if self.config.use_if_exists {
                "IF EXISTS "
            } else {
                ""
            };
            out.statement(
                format!("DROP TABLE {if_exists}{} CASCADE;", self.qualified(name)),
                true,
            );
        }
        out.blank();
    }

    fn emit_creates(&self, diff: &SchemaDiff, out: &mut Emitter) -> MigrationResult<()> {
        let added: Vec<&TableDiff> = diff.table_diffs.iter().filter(|t| t.added).collect();
        if added.is_empty() {
            return Ok(());
        }

        let mut tables: Vec<&TableDef> = Vec::with_capacity(added.len());
        for td in &added {
            match &td.target {
                Some(def) => tables.push(def),
                None => return Err(MigrationError::MissingTableDefinition(td.table.clone())),
            }
        }

        let plan = creation_order(&tables);
        if self.config.add_comments {
            out.comment("Added tables");
            if plan.has_cycles {
                out.comment(
                    "FK cycle detected: foreign keys are attached after all tables exist",
                );
            }
        }

        for name in &plan.order {
            let Some(table) = tables.iter().find(|t| t.name.eq_ignore_ascii_case(name)) else {
                continue;
            };
            out.statement(self.create_table_sql(table, plan.has_cycles), false);
            out.blank();
        }

        if plan.has_cycles {
            for name in &plan.order {
                let Some(table) = tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
                else {
                    continue;
                };
                for statement in self.deferred_fk_statements(table) {
                    out.statement(statement, false);
                }
            }
            out.blank();
        }

        Ok(())
    }

    fn emit_modifications(&self, diff: &SchemaDiff, out: &mut Emitter) {
        for td in &diff.table_diffs {
            if td.added || td.removed || !td.modified {
                continue;
            }
            let has_sql_work = !td.removed_columns.is_empty()
                || !td.added_columns.is_empty()
                || td.modified_columns.iter().any(column_needs_sql)
                || !td.removed_constraints.is_empty()
                || !td.added_constraints.is_empty()
                || !td.modified_constraints.is_empty();
            if !has_sql_work {
                continue;
            }

            if self.config.add_comments {
                out.comment(&format!("Modified table: {}", td.table));
            }
            let table = self.qualified(&td.table);

            for column in &td.removed_columns {
                let if_exists = if self.config.use_if_exists {
                    "IF EXISTS "
                } else {
                    ""
                };
                out.statement(
                    format!(
                        "ALTER TABLE {table} DROP COLUMN {if_exists}{};",
                        quote_ident(&column.name)
                    ),
                    true,
                );
            }

            for column in &td.added_columns {
                out.statement(
                    format!(
                        "ALTER TABLE {table} ADD COLUMN {};",
                        self.added_column_sql(column)
                    ),
                    false,
                );
            }

            for cd in &td.modified_columns {
                self.emit_column_changes(&table, cd, out);
            }

            for cd in &td.removed_constraints {
                self.emit_drop_constraint(&table, cd, out);
            }

            for cd in &td.added_constraints {
                self.emit_add_constraint(&table, cd, out);
            }

            for cd in &td.modified_constraints {
                self.emit_drop_constraint(&table, cd, out);
                self.emit_add_constraint(&table, cd, out);
            }

            out.blank();
        }
    }

    fn emit_column_changes(&self, table: &str, cd: &ColumnDiff, out: &mut Emitter) {
        let column = quote_ident(&cd.name);

        if let Some((old_type, new_type)) = &cd.type_change {
            if self.config.add_warnings {
                out.comment(&format!(
                    "WARNING: changing {} from {old_type} to {new_type} may fail or rewrite the table",
                    cd.name
                ));
            }
            out.statement(
                format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {new_type};"),
                false,
            );
        }

        if let Some((_, new_default)) = &cd.default_change {
            match new_default {
                Some(expr) => out.statement(
                    format!("ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {expr};"),
                    false,
                ),
                None => out.statement(
                    format!("ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT;"),
                    false,
                ),
            }
        }

        if let Some((was_nullable, now_nullable)) = cd.nullable_change {
            if was_nullable && !now_nullable {
                if self.config.add_warnings {
                    let backfill = cd
                        .default_change
                        .as_ref()
                        .and_then(|(_, new)| new.clone())
                        .unwrap_or_else(|| "/* backfill value */".to_string());
                    out.comment(&format!(
                        "UPDATE {table} SET {column} = {backfill} WHERE {column} IS NULL;"
                    ));
                }
                out.statement(
                    format!("ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL;"),
                    false,
                );
            } else if !was_nullable && now_nullable {
                out.statement(
                    format!("ALTER TABLE {table} ALTER COLUMN {column} DROP NOT NULL;"),
                    false,
                );
            }
        }
    }

    fn emit_drop_constraint(&self, table: &str, cd: &ConstraintDiff, out: &mut Emitter) {
        let if_exists = if self.config.use_if_exists {
            "IF EXISTS "
        } else {
            ""
        };
        match &cd.name {
            Some(name) => out.statement(
                format!(
                    "ALTER TABLE {table} DROP CONSTRAINT {if_exists}{};",
                    quote_ident(name)
                ),
                true,
            ),
            None => {
                // The constraint was never named; the real name lives only
                // in the database.
                out.comment(&format!(
                    "TODO: replace the placeholder with the database-assigned name of: {}",
                    cd.old_kind.as_deref().unwrap_or("constraint")
                ));
                out.statement(
                    format!("ALTER TABLE {table} DROP CONSTRAINT {if_exists}unnamed_constraint;"),
                    true,
                );
            }
        }
    }

    fn emit_add_constraint(&self, table: &str, cd: &ConstraintDiff, out: &mut Emitter) {
        let definition = match &cd.constraint {
            Some(constraint) => self.table_constraint_sql(constraint),
            None => {
                out.comment("TODO: constraint definition could not be reconstructed");
                let name = cd
                    .name
                    .as_ref()
                    .map(|n| format!("CONSTRAINT {} ", quote_ident(n)))
                    .unwrap_or_default();
                format!(
                    "{name}{}",
                    placeholder_definition(cd.new_kind.as_deref().or(cd.old_kind.as_deref()))
                )
            }
        };
        out.statement(format!("ALTER TABLE {table} ADD {definition};"), false);
    }

    // CREATE TABLE rendering

    /// Renders a complete CREATE TABLE statement. With `strip_fks`, both
    /// column-level REFERENCES and table-level FOREIGN KEY constraints
    /// are left out for later attachment.
    pub fn create_table_sql(&self, table: &TableDef, strip_fks: bool) -> String {
        let mut sql = String::from("CREATE ");
        match table.persistence {
            Persistence::Normal => {}
            Persistence::Temporary | Persistence::Unlogged => {
                sql.push_str(table.persistence.as_sql());
                sql.push(' ');
            }
        }
        sql.push_str(&format!("TABLE {} (", self.qualified(&table.name)));

        let mut lines: Vec<String> = Vec::new();
        for element in &table.elements {
            match element {
                TableElement::Column(column) => {
                    lines.push(format!("    {}", self.column_sql(column, strip_fks)));
                }
                TableElement::Constraint(constraint) => {
                    if strip_fks
                        && matches!(constraint.kind, TableConstraintKind::ForeignKey { .. })
                    {
                        continue;
                    }
                    lines.push(format!("    {}", self.table_constraint_sql(constraint)));
                }
                TableElement::Like(like) => {
                    lines.push(format!("    {}", like_sql(like)));
                }
            }
        }

        if lines.is_empty() {
            sql.push(')');
        } else {
            sql.push('\n');
            sql.push_str(&lines.join(",\n"));
            sql.push_str("\n)");
        }

        if !table.inherits.is_empty() {
            let parents: Vec<String> = table.inherits.iter().map(|p| self.qualified(p)).collect();
            sql.push_str(&format!(" INHERITS ({})", parents.join(", ")));
        }
        if let Some(partition) = &table.partition_by {
            sql.push_str(&format!(" PARTITION BY {} ({})", partition.method, partition.key));
        }
        if !table.storage_params.is_empty() {
            let params: Vec<String> = table
                .storage_params
                .iter()
                .map(|(k, v)| format!("{k} = {v}"))
                .collect();
            sql.push_str(&format!(" WITH ({})", params.join(", ")));
        }
        if let Some(on_commit) = table.on_commit {
            let clause = match on_commit {
                pgdrift_core::OnCommit::PreserveRows => "PRESERVE ROWS",
                pgdrift_core::OnCommit::DeleteRows => "DELETE ROWS",
                pgdrift_core::OnCommit::Drop => "DROP",
            };
            sql.push_str(&format!(" ON COMMIT {clause}"));
        }
        if let Some(tablespace) = &table.tablespace {
            sql.push_str(&format!(" TABLESPACE {}", quote_ident(tablespace)));
        }

        sql.push(';');
        sql
    }

    /// ALTER TABLE statements attaching the foreign keys stripped from a
    /// two-phase CREATE
    fn deferred_fk_statements(&self, table: &TableDef) -> Vec<String> {
        let qualified = self.qualified(&table.name);
        let mut statements = Vec::new();

        for column in table.columns() {
            for constraint in &column.constraints {
                if let ColumnConstraintKind::References {
                    table: ref_table,
                    column: ref_column,
                    match_kind,
                    on_delete,
                    on_update,
                } = &constraint.kind
                {
                    let mut sql = format!("ALTER TABLE {qualified} ADD ");
                    if let Some(name) = &constraint.name {
                        sql.push_str(&format!("CONSTRAINT {} ", quote_ident(name)));
                    }
                    sql.push_str(&format!(
                        "FOREIGN KEY ({}) REFERENCES {}",
                        quote_ident(&column.name),
                        self.qualified(ref_table)
                    ));
                    if let Some(ref_column) = ref_column {
                        sql.push_str(&format!(" ({})", quote_ident(ref_column)));
                    }
                    if let Some(match_kind) = match_kind {
                        sql.push_str(&format!(" {}", match_kind.as_sql()));
                    }
                    if let Some(action) = on_delete {
                        sql.push_str(&format!(" ON DELETE {}", action.as_sql()));
                    }
                    if let Some(action) = on_update {
                        sql.push_str(&format!(" ON UPDATE {}", action.as_sql()));
                    }
                    sql.push_str(&deferrability_sql(&constraint.deferrability));
                    sql.push(';');
                    statements.push(sql);
                }
            }
        }

        for constraint in table.table_constraints() {
            if matches!(constraint.kind, TableConstraintKind::ForeignKey { .. }) {
                statements.push(format!(
                    "ALTER TABLE {qualified} ADD {};",
                    self.table_constraint_sql(constraint)
                ));
            }
        }

        statements
    }

    /// Renders a full column definition for CREATE TABLE
    fn column_sql(&self, column: &Column, strip_fks: bool) -> String {
        let mut sql = format!("{} {}", quote_ident(&column.name), column.data_type);
        if column.storage.is_explicit() || column.storage == StorageKind::Default {
            sql.push_str(&format!(" STORAGE {}", column.storage.as_sql()));
        }
        if let Some(compression) = &column.compression {
            sql.push_str(&format!(" COMPRESSION {}", quote_ident(compression)));
        }
        if let Some(collation) = &column.collation {
            sql.push_str(&format!(" COLLATE {}", quote_ident(collation)));
        }
        for constraint in &column.constraints {
            if strip_fks
                && matches!(constraint.kind, ColumnConstraintKind::References { .. })
            {
                continue;
            }
            sql.push(' ');
            sql.push_str(&self.column_constraint_sql(constraint));
        }
        sql
    }

    /// Renders the reduced column definition used by ADD COLUMN: type,
    /// collation, DEFAULT, and NOT NULL only; key and FK constraints are
    /// added separately
    fn added_column_sql(&self, column: &Column) -> String {
        let mut sql = format!("{} {}", quote_ident(&column.name), column.data_type);
        if let Some(collation) = &column.collation {
            sql.push_str(&format!(" COLLATE {}", quote_ident(collation)));
        }
        if let Some(default) = column.default_expr() {
            sql.push_str(&format!(" DEFAULT {default}"));
        }
        if column.is_not_null() {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    fn column_constraint_sql(&self, constraint: &ColumnConstraint) -> String {
        let mut sql = String::new();
        if let Some(name) = &constraint.name {
            sql.push_str(&format!("CONSTRAINT {} ", quote_ident(name)));
        }
        match &constraint.kind {
            ColumnConstraintKind::NotNull => sql.push_str("NOT NULL"),
            ColumnConstraintKind::Null => sql.push_str("NULL"),
            ColumnConstraintKind::Default { expr } => {
                sql.push_str(&format!("DEFAULT {expr}"));
            }
            ColumnConstraintKind::Check { expr, no_inherit } => {
                sql.push_str(&format!("CHECK ({expr})"));
                if *no_inherit {
                    sql.push_str(" NO INHERIT");
                }
            }
            ColumnConstraintKind::Unique => sql.push_str("UNIQUE"),
            ColumnConstraintKind::PrimaryKey => sql.push_str("PRIMARY KEY"),
            ColumnConstraintKind::References {
                table,
                column,
                match_kind,
                on_delete,
                on_update,
            } => {
                sql.push_str(&format!("REFERENCES {}", self.qualified(table)));
                if let Some(column) = column {
                    sql.push_str(&format!(" ({})", quote_ident(column)));
                }
                if let Some(match_kind) = match_kind {
                    sql.push_str(&format!(" {}", match_kind.as_sql()));
                }
                if let Some(action) = on_delete {
                    sql.push_str(&format!(" ON DELETE {}", action.as_sql()));
                }
                if let Some(action) = on_update {
                    sql.push_str(&format!(" ON UPDATE {}", action.as_sql()));
                }
            }
            ColumnConstraintKind::GeneratedIdentity { kind, sequence } => {
                let kind = match kind {
                    GeneratedKind::Always => "ALWAYS",
                    GeneratedKind::ByDefault => "BY DEFAULT",
                };
                sql.push_str(&format!("GENERATED {kind} AS IDENTITY"));
                let options = sequence_options_sql(sequence);
                if !options.is_empty() {
                    sql.push_str(&format!(" ({options})"));
                }
            }
            ColumnConstraintKind::GeneratedExpr { expr, stored } => {
                sql.push_str(&format!("GENERATED ALWAYS AS ({expr})"));
                sql.push_str(if *stored { " STORED" } else { " VIRTUAL" });
            }
        }
        sql.push_str(&deferrability_sql(&constraint.deferrability));
        sql
    }

    /// Renders a table constraint, including its CONSTRAINT name prefix
    pub fn table_constraint_sql(&self, constraint: &TableConstraint) -> String {
        let mut sql = String::new();
        if let Some(name) = &constraint.name {
            sql.push_str(&format!("CONSTRAINT {} ", quote_ident(name)));
        }
        match &constraint.kind {
            TableConstraintKind::Check { expr, no_inherit } => {
                sql.push_str(&format!("CHECK ({expr})"));
                if *no_inherit {
                    sql.push_str(" NO INHERIT");
                }
            }
            TableConstraintKind::Unique {
                columns,
                nulls_distinct,
                without_overlaps,
            } => {
                sql.push_str("UNIQUE ");
                if let Some(distinct) = nulls_distinct {
                    sql.push_str(if *distinct {
                        "NULLS DISTINCT "
                    } else {
                        "NULLS NOT DISTINCT "
                    });
                }
                sql.push_str(&key_columns_sql(columns, *without_overlaps));
            }
            TableConstraintKind::PrimaryKey {
                columns,
                without_overlaps,
            } => {
                sql.push_str("PRIMARY KEY ");
                sql.push_str(&key_columns_sql(columns, *without_overlaps));
            }
            TableConstraintKind::ForeignKey {
                columns,
                period,
                ref_table,
                ref_columns,
                ref_period,
                match_kind,
                on_delete,
                on_update,
                set_columns_on_delete,
                set_columns_on_update,
            } => {
                sql.push_str(&format!(
                    "FOREIGN KEY ({}) REFERENCES {}",
                    fk_columns_sql(columns, *period),
                    self.qualified(ref_table)
                ));
                if !ref_columns.is_empty() {
                    sql.push_str(&format!(" ({})", fk_columns_sql(ref_columns, *ref_period)));
                }
                if let Some(match_kind) = match_kind {
                    sql.push_str(&format!(" {}", match_kind.as_sql()));
                }
                if let Some(action) = on_delete {
                    sql.push_str(&format!(" ON DELETE {}", action.as_sql()));
                    sql.push_str(&set_columns_sql(*action, set_columns_on_delete));
                }
                if let Some(action) = on_update {
                    sql.push_str(&format!(" ON UPDATE {}", action.as_sql()));
                    sql.push_str(&set_columns_sql(*action, set_columns_on_update));
                }
            }
            TableConstraintKind::Exclude {
                method,
                elements,
                predicate,
            } => {
                sql.push_str("EXCLUDE ");
                if let Some(method) = method {
                    sql.push_str(&format!("USING {} ", quote_ident(method)));
                }
                let rendered: Vec<String> = elements.iter().map(exclude_element_sql).collect();
                sql.push_str(&format!("({})", rendered.join(", ")));
                if let Some(predicate) = predicate {
                    sql.push_str(&format!(" WHERE ({predicate})"));
                }
            }
            TableConstraintKind::NotNull { column } => {
                sql.push_str(&format!("NOT NULL {}", quote_ident(column)));
            }
        }
        sql.push_str(&deferrability_sql(&constraint.deferrability));
        sql
    }

    fn qualified(&self, name: &str) -> String {
        match &self.config.schema_name {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(name)),
            None => quote_ident(name),
        }
    }
}

/// Quotes an identifier when it cannot be emitted bare: empty, leading
/// digit, or any character outside `[A-Za-z0-9_]`. Reserved words are
/// NOT quoted automatically; callers using keywords as identifiers must
/// pre-quote them.
pub fn quote_ident(name: &str) -> String {
    let needs_quoting = name.is_empty()
        || name.chars().next().is_some_and(|c| c.is_ascii_digit())
        || name
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_'));
    if needs_quoting {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Reverses `quote_ident`
pub fn unquote_ident(name: &str) -> String {
    if let Some(inner) = name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        inner.replace("\"\"", "\"")
    } else {
        name.to_string()
    }
}

fn key_columns_sql(columns: &[String], without_overlaps: bool) -> String {
    let mut rendered: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    if without_overlaps
        && let Some(last) = rendered.last_mut()
    {
        last.push_str(" WITHOUT OVERLAPS");
    }
    format!("({})", rendered.join(", "))
}

fn fk_columns_sql(columns: &[String], period: bool) -> String {
    let mut rendered: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    if period
        && let Some(last) = rendered.last_mut()
    {
        *last = format!("PERIOD {last}");
    }
    rendered.join(", ")
}

fn set_columns_sql(action: FkAction, columns: &[String]) -> String {
    if columns.is_empty()
        || !matches!(action, FkAction::SetNull | FkAction::SetDefault)
    {
        return String::new();
    }
    let rendered: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!(" ({})", rendered.join(", "))
}

fn exclude_element_sql(element: &ExcludeElement) -> String {
    let mut sql = element.expr.clone();
    if let Some(collation) = &element.collation {
        sql.push_str(&format!(" COLLATE {}", quote_ident(collation)));
    }
    if let Some(opclass) = &element.opclass {
        sql.push_str(&format!(" {opclass}"));
    }
    match element.sort_order {
        Some(SortOrder::Asc) => sql.push_str(" ASC"),
        Some(SortOrder::Desc) => sql.push_str(" DESC"),
        None => {}
    }
    match element.nulls_order {
        Some(NullsOrder::First) => sql.push_str(" NULLS FIRST"),
        Some(NullsOrder::Last) => sql.push_str(" NULLS LAST"),
        None => {}
    }
    sql.push_str(&format!(" WITH {}", element.operator));
    sql
}

fn sequence_options_sql(options: &SequenceOptions) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(start) = options.start {
        parts.push(format!("START WITH {start}"));
    }
    if let Some(increment) = options.increment {
        parts.push(format!("INCREMENT BY {increment}"));
    }
    if let Some(min) = options.min_value {
        parts.push(format!("MINVALUE {min}"));
    }
    if let Some(max) = options.max_value {
        parts.push(format!("MAXVALUE {max}"));
    }
    if let Some(cache) = options.cache {
        parts.push(format!("CACHE {cache}"));
    }
    match options.cycle {
        Some(true) => parts.push("CYCLE".to_string()),
        Some(false) => parts.push("NO CYCLE".to_string()),
        None => {}
    }
    parts.join(" ")
}

fn deferrability_sql(deferrability: &Deferrability) -> String {
    let mut sql = String::new();
    match deferrability.deferrable {
        Some(true) => sql.push_str(" DEFERRABLE"),
        Some(false) => sql.push_str(" NOT DEFERRABLE"),
        None => {}
    }
    match deferrability.initially_deferred {
        Some(true) => sql.push_str(" INITIALLY DEFERRED"),
        Some(false) => sql.push_str(" INITIALLY IMMEDIATE"),
        None => {}
    }
    if deferrability.enforced == Some(false) {
        sql.push_str(" NOT ENFORCED");
    }
    sql
}

fn like_sql(like: &LikeClause) -> String {
    let mut sql = format!("LIKE {}", quote_ident(&like.table));
    for option in &like.options {
        let verb = if option.including {
            "INCLUDING"
        } else {
            "EXCLUDING"
        };
        sql.push_str(&format!(" {verb} {}", option.option.to_uppercase()));
    }
    sql
}

/// Degraded fallback when a constraint definition cannot be rebuilt
fn placeholder_definition(kind: Option<&str>) -> String {
    match kind {
        Some("CHECK") => "CHECK (...)".to_string(),
        Some("UNIQUE") => "UNIQUE (...)".to_string(),
        Some("PRIMARY KEY") => "PRIMARY KEY (...)".to_string(),
        Some("FOREIGN KEY") => "FOREIGN KEY (...) REFERENCES ...".to_string(),
        Some("EXCLUDE") => "EXCLUDE (...)".to_string(),
        _ => "CHECK (...)".to_string(),
    }
}

/// True when a modified column produces any ALTER statement
fn column_needs_sql(cd: &ColumnDiff) -> bool {
    cd.type_change.is_some() || cd.default_change.is_some() || cd.nullable_change.is_some()
}

/// Accumulates statements, comments, and the migration counters
struct Emitter {
    sql: String,
    statement_count: usize,
    has_destructive: bool,
    safe_mode: bool,
}

impl Emitter {
    fn new(safe_mode: bool) -> Self {
        Self {
            sql: String::new(),
            statement_count: 0,
            has_destructive: false,
            safe_mode,
        }
    }

    fn comment(&mut self, text: &str) {
        self.sql.push_str("-- ");
        self.sql.push_str(text);
        self.sql.push('\n');
    }

    fn blank(&mut self) {
        if !self.sql.ends_with("\n\n") && !self.sql.is_empty() {
            self.sql.push('\n');
        }
    }

    /// Transaction control, not counted as a statement
    fn control(&mut self, sql: &str) {
        self.sql.push_str(sql);
        self.sql.push('\n');
    }

    fn statement(&mut self, sql: String, destructive: bool) {
        if destructive {
            self.has_destructive = true;
        }
        if destructive && self.safe_mode {
            self.sql.push_str("-- [safe mode] ");
        }
        self.sql.push_str(&sql);
        self.sql.push('\n');
        self.statement_count += 1;
    }
}
