//! Schema diff data structures
//!
//! The comparator reduces every difference it finds to an atomic
//! `DiffEntry` with a fixed kind and severity, grouped per table in a
//! `TableDiff` alongside the structured column and constraint buckets
//! the migration generator works from. All values are copied out of the
//! compared schemas, so a diff stays valid after the schemas are gone.

use serde::{Deserialize, Serialize};

use pgdrift_core::{Column, StorageKind, TableConstraint, TableDef};

/// Severity of a single difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Icon used by the report renderer
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Critical => "\u{2717}",
            Severity::Warning => "\u{26a0}",
            Severity::Info => "\u{2713}",
        }
    }
}

/// Closed set of difference kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    TableAdded,
    TableRemoved,
    TableModified,
    TableTypeChanged,
    TablespaceChanged,
    ColumnAdded,
    ColumnRemoved,
    ColumnTypeChanged,
    ColumnNullableChanged,
    ColumnDefaultChanged,
    ColumnCollationChanged,
    ColumnStorageChanged,
    ColumnCompressionChanged,
    ConstraintAdded,
    ConstraintRemoved,
    ConstraintModified,
    PartitionChanged,
    InheritsChanged,
    StorageParamsChanged,
}

impl DiffKind {
    /// The fixed severity of this kind of difference
    pub fn severity(&self) -> Severity {
        match self {
            DiffKind::TableRemoved
            | DiffKind::TableTypeChanged
            | DiffKind::ColumnRemoved
            | DiffKind::ColumnTypeChanged => Severity::Critical,
            DiffKind::TableAdded
            | DiffKind::ColumnAdded
            | DiffKind::ColumnNullableChanged
            | DiffKind::ConstraintRemoved => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// Human label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            DiffKind::TableAdded => "Table added",
            DiffKind::TableRemoved => "Table removed",
            DiffKind::TableModified => "Table modified",
            DiffKind::TableTypeChanged => "Table type changed",
            DiffKind::TablespaceChanged => "Tablespace changed",
            DiffKind::ColumnAdded => "Column added",
            DiffKind::ColumnRemoved => "Column removed",
            DiffKind::ColumnTypeChanged => "Column type changed",
            DiffKind::ColumnNullableChanged => "Column nullability changed",
            DiffKind::ColumnDefaultChanged => "Column default changed",
            DiffKind::ColumnCollationChanged => "Column collation changed",
            DiffKind::ColumnStorageChanged => "Column storage changed",
            DiffKind::ColumnCompressionChanged => "Column compression changed",
            DiffKind::ConstraintAdded => "Constraint added",
            DiffKind::ConstraintRemoved => "Constraint removed",
            DiffKind::ConstraintModified => "Constraint modified",
            DiffKind::PartitionChanged => "Partitioning changed",
            DiffKind::InheritsChanged => "Inheritance changed",
            DiffKind::StorageParamsChanged => "Storage parameters changed",
        }
    }
}

/// One atomic difference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub severity: Severity,
    /// Table the difference belongs to
    pub table: String,
    /// Column or constraint name, when the difference has one
    pub element: Option<String>,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl DiffEntry {
    /// Creates an entry with the kind's fixed severity
    pub fn new(kind: DiffKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            table: table.into(),
            element: None,
            old: None,
            new: None,
        }
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_old(mut self, old: impl Into<String>) -> Self {
        self.old = Some(old.into());
        self
    }

    pub fn with_new(mut self, new: impl Into<String>) -> Self {
        self.new = Some(new.into());
        self
    }
}

/// Aggregate counters over a schema diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    pub tables_added: usize,
    pub tables_removed: usize,
    pub tables_modified: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}

/// The complete diff between two schemas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Names of tables present only in the target
    pub added_tables: Vec<String>,
    /// Names of tables present only in the source
    pub removed_tables: Vec<String>,
    /// One entry per table with any difference, in match order
    pub table_diffs: Vec<TableDiff>,
}

impl SchemaDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the two schemas were equivalent
    pub fn is_empty(&self) -> bool {
        self.table_diffs.iter().all(|t| t.entries.is_empty())
    }

    /// Total number of atomic differences
    pub fn total_diffs(&self) -> usize {
        self.table_diffs.iter().map(|t| t.entries.len()).sum()
    }

    /// Iterates over every atomic difference in emission order
    pub fn entries(&self) -> impl Iterator<Item = &DiffEntry> {
        self.table_diffs.iter().flat_map(|t| t.entries.iter())
    }

    /// Computes the aggregate counters
    pub fn counts(&self) -> DiffCounts {
        let mut counts = DiffCounts {
            tables_added: self.added_tables.len(),
            tables_removed: self.removed_tables.len(),
            tables_modified: self.table_diffs.iter().filter(|t| t.modified).count(),
            ..DiffCounts::default()
        };
        for entry in self.entries() {
            counts.total += 1;
            match entry.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    /// True when any difference reaches the given severity
    pub fn has_severity(&self, severity: Severity) -> bool {
        self.entries().any(|e| e.severity >= severity)
    }
}

/// All differences found in one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDiff {
    pub table: String,
    pub added: bool,
    pub removed: bool,
    pub modified: bool,
    pub type_changed: bool,
    pub tablespace_changed: bool,
    /// Columns present only in the target, in declaration order
    pub added_columns: Vec<Column>,
    /// Columns present only in the source
    pub removed_columns: Vec<Column>,
    pub modified_columns: Vec<ColumnDiff>,
    pub added_constraints: Vec<ConstraintDiff>,
    pub removed_constraints: Vec<ConstraintDiff>,
    pub modified_constraints: Vec<ConstraintDiff>,
    /// Atomic differences in the order they were found
    pub entries: Vec<DiffEntry>,
    /// Full target definition, present for added and modified tables;
    /// the generator needs it to emit CREATE TABLE
    pub target: Option<TableDef>,
}

impl TableDiff {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            added: false,
            removed: false,
            modified: false,
            type_changed: false,
            tablespace_changed: false,
            added_columns: Vec::new(),
            removed_columns: Vec::new(),
            modified_columns: Vec::new(),
            added_constraints: Vec::new(),
            removed_constraints: Vec::new(),
            modified_constraints: Vec::new(),
            entries: Vec::new(),
            target: None,
        }
    }

    /// Records an atomic difference
    pub fn push_entry(&mut self, entry: DiffEntry) {
        self.entries.push(entry);
    }

    /// True when nothing differs in this table
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Changes to a single column present on both sides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnDiff {
    pub name: String,
    /// Declared type change (old, new)
    pub type_change: Option<(String, String)>,
    /// NOT NULL change (old, new), true meaning nullable
    pub nullable_change: Option<(bool, bool)>,
    /// Default expression change (old, new)
    pub default_change: Option<(Option<String>, Option<String>)>,
    /// Collation change (old, new)
    pub collation_change: Option<(String, String)>,
    /// Storage strategy change (old, new)
    pub storage_change: Option<(StorageKind, StorageKind)>,
    /// Compression method change (old, new)
    pub compression_change: Option<(Option<String>, Option<String>)>,
}

impl ColumnDiff {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True when no field differs
    pub fn is_empty(&self) -> bool {
        self.type_change.is_none()
            && self.nullable_change.is_none()
            && self.default_change.is_none()
            && self.collation_change.is_none()
            && self.storage_change.is_none()
            && self.compression_change.is_none()
    }
}

/// An added, removed, or modified constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintDiff {
    /// Constraint name, when one was given
    pub name: Option<String>,
    /// Kind label of the source-side constraint, for removed/modified
    pub old_kind: Option<String>,
    /// Kind label of the target-side constraint, for added/modified
    pub new_kind: Option<String>,
    /// True when the constraint was promoted from an inline column
    /// constraint; `column` then names that column
    pub inline: bool,
    pub column: Option<String>,
    /// The underlying constraint definition used for regeneration: the
    /// target-side one for adds and modifications, the source-side one
    /// for removals. Promoted inline constraints carry their synthetic
    /// table-level form.
    pub constraint: Option<TableConstraint>,
}

impl ConstraintDiff {
    /// The element name carried into diff entries: the constraint name,
    /// the owning column for promoted inline constraints, `(unnamed)`
    /// otherwise
    pub fn element_name(&self) -> String {
        if let Some(name) = &self.name {
            name.clone()
        } else if let Some(column) = &self.column {
            column.clone()
        } else {
            "(unnamed)".to_string()
        }
    }
}
