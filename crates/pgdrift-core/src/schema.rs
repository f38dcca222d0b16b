//! Schema model types
//!
//! The model is produced by the DDL parser or the live-database
//! introspection adapter and consumed read-only by the comparator, the
//! migration generator, and the report renderer. Element order is
//! preserved everywhere; nothing in the pipeline mutates a schema after
//! construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::normalize;

/// A named collection of table definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name, `public` unless stated otherwise
    pub name: String,
    /// Tables in declaration order
    pub tables: Vec<TableDef>,
    /// Custom types, reserved for a later release
    pub types: Vec<String>,
    /// Functions, reserved for a later release
    pub functions: Vec<String>,
    /// Procedures, reserved for a later release
    pub procedures: Vec<String>,
}

impl Schema {
    /// Creates an empty schema with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            types: Vec::new(),
            functions: Vec::new(),
            procedures: Vec::new(),
        }
    }

    /// Creates an empty schema named `public`
    pub fn public() -> Self {
        Self::new("public")
    }

    /// Appends a table, rejecting duplicate names (case-insensitive)
    pub fn push_table(&mut self, table: TableDef) -> Result<()> {
        if self
            .tables
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&table.name))
        {
            return Err(SchemaError::DuplicateTable(table.name));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Looks up a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Returns true if the schema holds no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// How a table was declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    /// Plain `CREATE TABLE (...)`
    Regular,
    /// `CREATE TABLE ... PARTITION OF parent FOR VALUES ...`
    PartitionOf { parent: String, bound: String },
    /// `CREATE TABLE ... OF type_name`
    TypedOf { type_name: String },
}

/// Table persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Persistence {
    #[default]
    Normal,
    Temporary,
    Unlogged,
}

impl Persistence {
    /// SQL keyword spelling, empty for normal tables
    pub fn as_sql(&self) -> &'static str {
        match self {
            Persistence::Normal => "",
            Persistence::Temporary => "TEMPORARY",
            Persistence::Unlogged => "UNLOGGED",
        }
    }
}

/// `ON COMMIT` behavior for temporary tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnCommit {
    PreserveRows,
    DeleteRows,
    Drop,
}

/// Partitioning method of a partitioned parent table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionMethod {
    Range,
    List,
    Hash,
}

impl fmt::Display for PartitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionMethod::Range => write!(f, "RANGE"),
            PartitionMethod::List => write!(f, "LIST"),
            PartitionMethod::Hash => write!(f, "HASH"),
        }
    }
}

/// `PARTITION BY <method> (<key>)` clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub method: PartitionMethod,
    /// Verbatim key expression list between the parentheses
    pub key: String,
}

/// A single table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub kind: TableKind,
    pub persistence: Persistence,
    /// Tablespace, present only when explicitly declared or non-default
    pub tablespace: Option<String>,
    /// `WITH (...)` storage parameters in declaration order
    pub storage_params: Vec<(String, String)>,
    /// Parent tables named by `INHERITS (...)`
    pub inherits: Vec<String>,
    pub partition_by: Option<PartitionSpec>,
    pub on_commit: Option<OnCommit>,
    /// Columns, table constraints, and LIKE clauses in declaration order
    pub elements: Vec<TableElement>,
}

impl TableDef {
    /// Creates a regular, normal-persistence table with no elements
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::Regular,
            persistence: Persistence::Normal,
            tablespace: None,
            storage_params: Vec::new(),
            inherits: Vec::new(),
            partition_by: None,
            on_commit: None,
            elements: Vec::new(),
        }
    }

    /// Iterates over column elements in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.elements.iter().filter_map(|e| match e {
            TableElement::Column(c) => Some(c),
            _ => None,
        })
    }

    /// Iterates over table-level constraints in declaration order
    pub fn table_constraints(&self) -> impl Iterator<Item = &TableConstraint> {
        self.elements.iter().filter_map(|e| match e {
            TableElement::Constraint(c) => Some(c),
            _ => None,
        })
    }

    /// Iterates over LIKE clauses in declaration order
    pub fn like_clauses(&self) -> impl Iterator<Item = &LikeClause> {
        self.elements.iter().filter_map(|e| match e {
            TableElement::Like(l) => Some(l),
            _ => None,
        })
    }

    /// Looks up a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Names of every table this table references through a foreign key,
    /// both column-level `REFERENCES` and table-level `FOREIGN KEY`
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for col in self.columns() {
            for constraint in &col.constraints {
                if let ColumnConstraintKind::References { table, .. } = &constraint.kind {
                    out.push(table.as_str());
                }
            }
        }
        for constraint in self.table_constraints() {
            if let TableConstraintKind::ForeignKey { ref_table, .. } = &constraint.kind {
                out.push(ref_table.as_str());
            }
        }
        out
    }

    /// Checks the structural invariants of a well-formed table
    pub fn violations(&self) -> Vec<SchemaError> {
        let mut violations = Vec::new();

        let mut seen: Vec<String> = Vec::new();
        for col in self.columns() {
            let folded = col.name.to_lowercase();
            if seen.contains(&folded) {
                violations.push(SchemaError::DuplicateColumn(
                    self.name.clone(),
                    col.name.clone(),
                ));
            } else {
                seen.push(folded);
            }

            let has_identity = col.constraints.iter().any(|c| {
                matches!(c.kind, ColumnConstraintKind::GeneratedIdentity { .. })
            });
            let has_default = col
                .constraints
                .iter()
                .any(|c| matches!(c.kind, ColumnConstraintKind::Default { .. }));
            if has_identity && has_default {
                violations.push(SchemaError::IdentityWithDefault(
                    self.name.clone(),
                    col.name.clone(),
                ));
            }
        }

        let pk_count = self
            .table_constraints()
            .filter(|c| matches!(c.kind, TableConstraintKind::PrimaryKey { .. }))
            .count();
        if pk_count > 1 {
            violations.push(SchemaError::MultiplePrimaryKeys(self.name.clone()));
        }

        for constraint in self.table_constraints() {
            if let TableConstraintKind::ForeignKey {
                columns,
                ref_columns,
                ..
            } = &constraint.kind
                && !ref_columns.is_empty()
                && columns.len() != ref_columns.len()
            {
                violations.push(SchemaError::ForeignKeyArity(
                    self.name.clone(),
                    ref_columns.len(),
                    columns.len(),
                ));
            }
        }

        violations
    }
}

/// One entry in a table body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableElement {
    Column(Column),
    Constraint(TableConstraint),
    Like(LikeClause),
}

/// `LIKE source_table (INCLUDING|EXCLUDING ...)*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeClause {
    pub table: String,
    pub options: Vec<LikeOption>,
}

/// A single INCLUDING/EXCLUDING modifier on a LIKE clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOption {
    pub including: bool,
    pub option: String,
}

/// TOAST storage strategy of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageKind {
    Plain,
    External,
    Extended,
    Main,
    /// `STORAGE DEFAULT` was written explicitly
    Default,
    /// No storage clause present
    #[default]
    Unset,
}

impl StorageKind {
    /// True when the column carries an explicit non-default strategy
    pub fn is_explicit(&self) -> bool {
        !matches!(self, StorageKind::Default | StorageKind::Unset)
    }

    /// SQL keyword spelling
    pub fn as_sql(&self) -> &'static str {
        match self {
            StorageKind::Plain => "PLAIN",
            StorageKind::External => "EXTERNAL",
            StorageKind::Extended => "EXTENDED",
            StorageKind::Main => "MAIN",
            StorageKind::Default => "DEFAULT",
            StorageKind::Unset => "",
        }
    }
}

/// A column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Declared type, verbatim, including precision and `[]` markers
    pub data_type: String,
    pub collation: Option<String>,
    pub storage: StorageKind,
    pub compression: Option<String>,
    /// Column constraints in declaration order
    pub constraints: Vec<ColumnConstraint>,
}

impl Column {
    /// Creates a column with no constraints
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            collation: None,
            storage: StorageKind::Unset,
            compression: None,
            constraints: Vec::new(),
        }
    }

    /// True when the column carries a NOT NULL constraint
    pub fn is_not_null(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ColumnConstraintKind::NotNull))
    }

    /// The DEFAULT expression, if any
    pub fn default_expr(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match &c.kind {
            ColumnConstraintKind::Default { expr } => Some(expr.as_str()),
            _ => None,
        })
    }

    /// True when the column carries an inline PRIMARY KEY
    pub fn is_inline_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ColumnConstraintKind::PrimaryKey))
    }

    /// True when the column carries an inline UNIQUE
    pub fn is_inline_unique(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ColumnConstraintKind::Unique))
    }

    /// Collation with the `default` sentinel treated as absent
    pub fn effective_collation(&self) -> Option<&str> {
        match self.collation.as_deref() {
            Some(c) if !normalize::is_default_collation(c) => Some(c),
            _ => None,
        }
    }
}

/// Deferrability flags, orthogonal to the constraint kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deferrability {
    /// `DEFERRABLE` / `NOT DEFERRABLE`
    pub deferrable: Option<bool>,
    /// `INITIALLY DEFERRED` / `INITIALLY IMMEDIATE`
    pub initially_deferred: Option<bool>,
    /// `NOT ENFORCED` sets this to false
    pub enforced: Option<bool>,
}

/// Referential match type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FkMatch {
    Full,
    Partial,
    Simple,
}

impl FkMatch {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FkMatch::Full => "MATCH FULL",
            FkMatch::Partial => "MATCH PARTIAL",
            FkMatch::Simple => "MATCH SIMPLE",
        }
    }
}

/// Referential action for ON DELETE / ON UPDATE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl FkAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::NoAction => "NO ACTION",
            FkAction::Restrict => "RESTRICT",
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// `GENERATED ALWAYS` vs `GENERATED BY DEFAULT` for identity columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratedKind {
    Always,
    ByDefault,
}

/// Sequence options attached to an identity column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceOptions {
    pub start: Option<i64>,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cache: Option<i64>,
    pub cycle: Option<bool>,
}

impl SequenceOptions {
    /// True when no option was specified
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A constraint attached to a single column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConstraint {
    /// User-supplied name from a `CONSTRAINT <name>` prefix
    pub name: Option<String>,
    pub kind: ColumnConstraintKind,
    pub deferrability: Deferrability,
}

impl ColumnConstraint {
    /// Creates an unnamed constraint with default deferrability
    pub fn new(kind: ColumnConstraintKind) -> Self {
        Self {
            name: None,
            kind,
            deferrability: Deferrability::default(),
        }
    }
}

/// Column constraint payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnConstraintKind {
    NotNull,
    Null,
    Default {
        expr: String,
    },
    Check {
        expr: String,
        no_inherit: bool,
    },
    Unique,
    PrimaryKey,
    References {
        table: String,
        column: Option<String>,
        match_kind: Option<FkMatch>,
        on_delete: Option<FkAction>,
        on_update: Option<FkAction>,
    },
    GeneratedIdentity {
        kind: GeneratedKind,
        sequence: SequenceOptions,
    },
    /// `GENERATED ALWAYS AS (expr) STORED|VIRTUAL`
    GeneratedExpr {
        expr: String,
        stored: bool,
    },
}

/// A table-level constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConstraint {
    pub name: Option<String>,
    pub kind: TableConstraintKind,
    pub deferrability: Deferrability,
}

impl TableConstraint {
    /// Creates an unnamed constraint with default deferrability
    pub fn new(kind: TableConstraintKind) -> Self {
        Self {
            name: None,
            kind,
            deferrability: Deferrability::default(),
        }
    }
}

/// Table constraint payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableConstraintKind {
    Check {
        expr: String,
        no_inherit: bool,
    },
    Unique {
        columns: Vec<String>,
        /// Set only when `NULLS [NOT] DISTINCT` was written
        nulls_distinct: Option<bool>,
        /// Last column is `WITHOUT OVERLAPS`
        without_overlaps: bool,
    },
    PrimaryKey {
        columns: Vec<String>,
        without_overlaps: bool,
    },
    ForeignKey {
        columns: Vec<String>,
        /// Last local column is a `PERIOD` column
        period: bool,
        ref_table: String,
        ref_columns: Vec<String>,
        ref_period: bool,
        match_kind: Option<FkMatch>,
        on_delete: Option<FkAction>,
        on_update: Option<FkAction>,
        /// Column list of `ON DELETE SET NULL/DEFAULT (cols)`
        set_columns_on_delete: Vec<String>,
        set_columns_on_update: Vec<String>,
    },
    Exclude {
        /// `USING <method>`, usually gist
        method: Option<String>,
        elements: Vec<ExcludeElement>,
        predicate: Option<String>,
    },
    /// Table-level `NOT NULL column` spelling
    NotNull {
        column: String,
    },
}

impl TableConstraintKind {
    /// Short label used in diff entries and reports
    pub fn label(&self) -> &'static str {
        match self {
            TableConstraintKind::Check { .. } => "CHECK",
            TableConstraintKind::Unique { .. } => "UNIQUE",
            TableConstraintKind::PrimaryKey { .. } => "PRIMARY KEY",
            TableConstraintKind::ForeignKey { .. } => "FOREIGN KEY",
            TableConstraintKind::Exclude { .. } => "EXCLUDE",
            TableConstraintKind::NotNull { .. } => "NOT NULL",
        }
    }
}

/// Sort direction inside an exclusion constraint element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Null ordering inside an exclusion constraint element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}

/// One `element WITH operator` entry of an exclusion constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeElement {
    /// Column name or parenthesized expression, verbatim
    pub expr: String,
    pub collation: Option<String>,
    pub opclass: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub nulls_order: Option<NullsOrder>,
    /// The exclusion operator after WITH
    pub operator: String,
}
