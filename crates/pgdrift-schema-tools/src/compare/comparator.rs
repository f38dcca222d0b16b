//! Schema comparator
//!
//! Walks two schemas table by table and produces a `SchemaDiff`. All
//! equivalence questions (type aliases, cast-bearing defaults, inline vs
//! table-level key constraints) are settled here so the generator and
//! the report renderer can treat the diff as ground truth.

use thiserror::Error;

use pgdrift_core::normalize;
use pgdrift_core::{
    Column, ColumnConstraintKind, Deferrability, FkAction, FkMatch, PartitionSpec, Persistence,
    Schema, TableConstraint, TableConstraintKind, TableDef, TableElement, TableKind,
};

use super::diff::{ColumnDiff, ConstraintDiff, DiffEntry, DiffKind, SchemaDiff, TableDiff};

/// Errors that can occur during schema comparison
#[derive(Debug, Error)]
pub enum CompareError {
    /// The same table name appears twice in one schema
    #[error("schema '{0}' is malformed: duplicate table '{1}'")]
    DuplicateTable(String, String),
}

/// Result type for comparison operations
pub type CompareResult<T> = std::result::Result<T, CompareError>;

/// Configuration for schema comparison
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Compare identifiers case-sensitively
    pub case_sensitive: bool,
    /// Canonicalize type names before comparing them
    pub normalize_types: bool,
    /// Ignore constraint names when matching constraints
    pub ignore_constraint_names: bool,
    /// Ignore whitespace when comparing captured expressions
    pub ignore_whitespace: bool,
    /// Compare tablespaces
    pub compare_tablespaces: bool,
    /// Compare `WITH (...)` storage parameters
    pub compare_storage_params: bool,
    /// Compare constraints at all
    pub compare_constraints: bool,
    /// Flag partitioning differences
    pub compare_partitioning: bool,
    /// Flag inheritance differences
    pub compare_inheritance: bool,
    /// A table is considered only if its name contains one of these
    /// substrings (empty means all tables)
    pub include_patterns: Vec<String>,
    /// A table is skipped if its name contains one of these substrings
    pub exclude_patterns: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            normalize_types: true,
            ignore_constraint_names: false,
            ignore_whitespace: true,
            compare_tablespaces: true,
            compare_storage_params: true,
            compare_constraints: true,
            compare_partitioning: true,
            compare_inheritance: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl CompareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes identifier comparison case-sensitive
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Disables type name canonicalization
    pub fn without_type_normalization(mut self) -> Self {
        self.normalize_types = false;
        self
    }

    /// Matches constraints by shape only, not by name
    pub fn ignoring_constraint_names(mut self) -> Self {
        self.ignore_constraint_names = true;
        self
    }

    /// Disables constraint comparison
    pub fn without_constraints(mut self) -> Self {
        self.compare_constraints = false;
        self
    }

    /// Disables tablespace comparison
    pub fn without_tablespaces(mut self) -> Self {
        self.compare_tablespaces = false;
        self
    }

    /// Adds an include pattern (substring containment)
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_patterns.push(pattern.into());
        self
    }

    /// Adds an exclude pattern (substring containment)
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }
}

/// Schema comparator
#[derive(Debug, Default)]
pub struct SchemaComparator {
    config: CompareConfig,
}

impl SchemaComparator {
    /// Creates a comparator with the default configuration
    pub fn new() -> Self {
        Self {
            config: CompareConfig::default(),
        }
    }

    /// Creates a comparator with the given configuration
    pub fn with_config(config: CompareConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compares a source schema against a target schema.
    ///
    /// The diff is directional: it describes what has to happen to the
    /// source for it to become the target.
    pub fn compare(&self, source: &Schema, target: &Schema) -> CompareResult<SchemaDiff> {
        self.validate(source)?;
        self.validate(target)?;

        let mut diff = SchemaDiff::new();

        for src_table in &source.tables {
            if !self.table_included(&src_table.name) {
                continue;
            }
            let matched = target
                .tables
                .iter()
                .filter(|t| self.table_included(&t.name))
                .find(|t| self.names_equal(&t.name, &src_table.name));
            match matched {
                Some(tgt_table) => {
                    let table_diff = self.compare_tables(src_table, tgt_table);
                    if !table_diff.is_empty() {
                        diff.table_diffs.push(table_diff);
                    }
                }
                None => {
                    diff.removed_tables.push(src_table.name.clone());
                    let mut td = TableDiff::new(&src_table.name);
                    td.removed = true;
                    td.push_entry(DiffEntry::new(DiffKind::TableRemoved, &src_table.name));
                    diff.table_diffs.push(td);
                }
            }
        }

        for tgt_table in &target.tables {
            if !self.table_included(&tgt_table.name) {
                continue;
            }
            let in_source = source
                .tables
                .iter()
                .filter(|t| self.table_included(&t.name))
                .any(|t| self.names_equal(&t.name, &tgt_table.name));
            if !in_source {
                diff.added_tables.push(tgt_table.name.clone());
                let mut td = TableDiff::new(&tgt_table.name);
                td.added = true;
                td.target = Some(tgt_table.clone());
                td.push_entry(DiffEntry::new(DiffKind::TableAdded, &tgt_table.name));
                diff.table_diffs.push(td);
            }
        }

        tracing::debug!(
            added = diff.added_tables.len(),
            removed = diff.removed_tables.len(),
            total = diff.total_diffs(),
            "schema comparison finished"
        );
        Ok(diff)
    }

    /// Compares two matched tables
    pub fn compare_tables(&self, source: &TableDef, target: &TableDef) -> TableDiff {
        let mut td = TableDiff::new(&target.name);
        td.target = Some(target.clone());

        if source.persistence != target.persistence {
            td.type_changed = true;
            td.push_entry(
                DiffEntry::new(DiffKind::TableTypeChanged, &target.name)
                    .with_old(persistence_label(source.persistence))
                    .with_new(persistence_label(target.persistence)),
            );
        }

        if self.config.compare_tablespaces
            && !self.opt_names_equal(source.tablespace.as_deref(), target.tablespace.as_deref())
        {
            td.tablespace_changed = true;
            td.push_entry(
                DiffEntry::new(DiffKind::TablespaceChanged, &target.name)
                    .with_old(source.tablespace.clone().unwrap_or_else(none_marker))
                    .with_new(target.tablespace.clone().unwrap_or_else(none_marker)),
            );
        }

        let both_regular =
            source.kind == TableKind::Regular && target.kind == TableKind::Regular;
        if !both_regular && !same_table_kind(&source.kind, &target.kind) {
            td.push_entry(
                DiffEntry::new(DiffKind::PartitionChanged, &target.name)
                    .with_old(table_kind_label(&source.kind))
                    .with_new(table_kind_label(&target.kind)),
            );
        }

        if both_regular {
            self.compare_columns(source, target, &mut td);
            if self.config.compare_constraints {
                self.compare_constraints(source, target, &mut td);
            }
        }

        // Partitioning and inheritance are compared as placeholders only:
        // textual differences are flagged, no migration SQL is generated
        // for them.
        if self.config.compare_partitioning {
            let src = source.partition_by.as_ref().map(partition_label);
            let tgt = target.partition_by.as_ref().map(partition_label);
            let equal = match (&src, &tgt) {
                (Some(a), Some(b)) => self.exprs_equal(a, b),
                (None, None) => true,
                _ => false,
            };
            if !equal {
                td.push_entry(
                    DiffEntry::new(DiffKind::PartitionChanged, &target.name)
                        .with_old(src.unwrap_or_else(none_marker))
                        .with_new(tgt.unwrap_or_else(none_marker)),
                );
            }
        }

        if self.config.compare_inheritance && !self.name_lists_equal(&source.inherits, &target.inherits)
        {
            td.push_entry(
                DiffEntry::new(DiffKind::InheritsChanged, &target.name)
                    .with_old(join_or_none(&source.inherits))
                    .with_new(join_or_none(&target.inherits)),
            );
        }

        if self.config.compare_storage_params
            && !storage_params_equal(&source.storage_params, &target.storage_params)
        {
            td.push_entry(
                DiffEntry::new(DiffKind::StorageParamsChanged, &target.name)
                    .with_old(render_params(&source.storage_params))
                    .with_new(render_params(&target.storage_params)),
            );
        }

        td.modified = !td.entries.is_empty();
        td
    }

    // Column comparison

    fn compare_columns(&self, source: &TableDef, target: &TableDef, td: &mut TableDiff) {
        for tgt_col in target.columns() {
            match self.find_column(source, &tgt_col.name) {
                None => {
                    td.push_entry(
                        DiffEntry::new(DiffKind::ColumnAdded, &td.table)
                            .with_element(&tgt_col.name)
                            .with_new(&tgt_col.data_type),
                    );
                    td.added_columns.push(tgt_col.clone());
                }
                Some(src_col) => {
                    let column_diff = self.compare_column(src_col, tgt_col, td);
                    if !column_diff.is_empty() {
                        td.modified_columns.push(column_diff);
                    }
                }
            }
        }

        for src_col in source.columns() {
            if self.find_column(target, &src_col.name).is_none() {
                td.push_entry(
                    DiffEntry::new(DiffKind::ColumnRemoved, &td.table)
                        .with_element(&src_col.name)
                        .with_old(&src_col.data_type),
                );
                td.removed_columns.push(src_col.clone());
            }
        }
    }

    fn compare_column(&self, source: &Column, target: &Column, td: &mut TableDiff) -> ColumnDiff {
        let mut cd = ColumnDiff::new(&target.name);
        let table = td.table.clone();

        if !normalize::types_equal(
            &source.data_type,
            &target.data_type,
            self.config.normalize_types,
        ) {
            cd.type_change = Some((source.data_type.clone(), target.data_type.clone()));
            td.push_entry(
                DiffEntry::new(DiffKind::ColumnTypeChanged, &table)
                    .with_element(&target.name)
                    .with_old(&source.data_type)
                    .with_new(&target.data_type),
            );
        }

        let src_nullable = !source.is_not_null();
        let tgt_nullable = !target.is_not_null();
        if src_nullable != tgt_nullable {
            cd.nullable_change = Some((src_nullable, tgt_nullable));
            td.push_entry(
                DiffEntry::new(DiffKind::ColumnNullableChanged, &table)
                    .with_element(&target.name)
                    .with_old(nullable_label(src_nullable))
                    .with_new(nullable_label(tgt_nullable)),
            );
        }

        let src_default = source.default_expr();
        let tgt_default = target.default_expr();
        let defaults_equal = match (src_default, tgt_default) {
            (None, None) => true,
            (Some(a), Some(b)) => self.exprs_equal(a, b),
            _ => false,
        };
        if !defaults_equal {
            cd.default_change = Some((
                src_default.map(str::to_string),
                tgt_default.map(str::to_string),
            ));
            td.push_entry(
                DiffEntry::new(DiffKind::ColumnDefaultChanged, &table)
                    .with_element(&target.name)
                    .with_old(src_default.map(str::to_string).unwrap_or_else(none_marker))
                    .with_new(tgt_default.map(str::to_string).unwrap_or_else(none_marker)),
            );
        }

        // Collation differences only count when both sides carry an
        // explicit collation; the `default` sentinel counts as absent.
        if let (Some(src_coll), Some(tgt_coll)) =
            (source.effective_collation(), target.effective_collation())
            && !self.names_equal(src_coll, tgt_coll)
        {
            cd.collation_change = Some((src_coll.to_string(), tgt_coll.to_string()));
            td.push_entry(
                DiffEntry::new(DiffKind::ColumnCollationChanged, &table)
                    .with_element(&target.name)
                    .with_old(src_coll)
                    .with_new(tgt_coll),
            );
        }

        // Storage differences only count when both sides are explicit;
        // file DDL usually omits storage while introspection always
        // reports it.
        if source.storage.is_explicit()
            && target.storage.is_explicit()
            && source.storage != target.storage
        {
            cd.storage_change = Some((source.storage, target.storage));
            td.push_entry(
                DiffEntry::new(DiffKind::ColumnStorageChanged, &table)
                    .with_element(&target.name)
                    .with_old(source.storage.as_sql())
                    .with_new(target.storage.as_sql()),
            );
        }

        let compressions_equal =
            self.opt_names_equal(source.compression.as_deref(), target.compression.as_deref());
        if !compressions_equal {
            cd.compression_change = Some((source.compression.clone(), target.compression.clone()));
            td.push_entry(
                DiffEntry::new(DiffKind::ColumnCompressionChanged, &table)
                    .with_element(&target.name)
                    .with_old(source.compression.clone().unwrap_or_else(none_marker))
                    .with_new(target.compression.clone().unwrap_or_else(none_marker)),
            );
        }

        cd
    }

    // Constraint comparison

    fn compare_constraints(&self, source: &TableDef, target: &TableDef, td: &mut TableDiff) {
        let src_items = self.collect_matchable(source, None);
        let tgt_items = self.collect_matchable(target, Some(source));

        let mut src_matched = vec![false; src_items.len()];
        let mut tgt_matched = vec![false; tgt_items.len()];

        // Pass 1: direct equivalence
        for (ti, tgt) in tgt_items.iter().enumerate() {
            for (si, src) in src_items.iter().enumerate() {
                if !src_matched[si] && self.constraints_equivalent(src, tgt) {
                    src_matched[si] = true;
                    tgt_matched[ti] = true;
                    break;
                }
            }
        }

        // Pass 2: a table-level key constraint over N columns matches N
        // single-column inline constraints covering its columns exactly
        self.match_n_to_one(&tgt_items, &src_items, &mut tgt_matched, &mut src_matched);
        self.match_n_to_one(&src_items, &tgt_items, &mut src_matched, &mut tgt_matched);

        // Pass 3: same name and kind on both sides is a modification
        if !self.config.ignore_constraint_names {
            for (ti, tgt) in tgt_items.iter().enumerate() {
                if tgt_matched[ti] {
                    continue;
                }
                let Some(tgt_name) = &tgt.name else { continue };
                for (si, src) in src_items.iter().enumerate() {
                    if src_matched[si] {
                        continue;
                    }
                    let Some(src_name) = &src.name else { continue };
                    if self.names_equal(src_name, tgt_name)
                        && src.kind.label() == tgt.kind.label()
                    {
                        src_matched[si] = true;
                        tgt_matched[ti] = true;
                        let cd = ConstraintDiff {
                            name: Some(tgt_name.clone()),
                            old_kind: Some(src.kind.label().to_string()),
                            new_kind: Some(tgt.kind.label().to_string()),
                            inline: tgt.inline,
                            column: tgt.column.clone(),
                            constraint: Some(tgt.to_constraint()),
                        };
                        td.push_entry(
                            DiffEntry::new(DiffKind::ConstraintModified, &td.table)
                                .with_element(cd.element_name())
                                .with_old(describe_constraint(&src.kind))
                                .with_new(describe_constraint(&tgt.kind)),
                        );
                        td.modified_constraints.push(cd);
                        break;
                    }
                }
            }
        }

        for (ti, tgt) in tgt_items.iter().enumerate() {
            if tgt_matched[ti] {
                continue;
            }
            let cd = ConstraintDiff {
                name: tgt.name.clone(),
                old_kind: None,
                new_kind: Some(tgt.kind.label().to_string()),
                inline: tgt.inline,
                column: tgt.column.clone(),
                constraint: Some(tgt.to_constraint()),
            };
            td.push_entry(
                DiffEntry::new(DiffKind::ConstraintAdded, &td.table)
                    .with_element(cd.element_name())
                    .with_new(describe_constraint(&tgt.kind)),
            );
            td.added_constraints.push(cd);
        }

        for (si, src) in src_items.iter().enumerate() {
            if src_matched[si] {
                continue;
            }
            let cd = ConstraintDiff {
                name: src.name.clone(),
                old_kind: Some(src.kind.label().to_string()),
                new_kind: None,
                inline: src.inline,
                column: src.column.clone(),
                constraint: Some(src.to_constraint()),
            };
            td.push_entry(
                DiffEntry::new(DiffKind::ConstraintRemoved, &td.table)
                    .with_element(cd.element_name())
                    .with_old(describe_constraint(&src.kind)),
            );
            td.removed_constraints.push(cd);
        }
    }

    /// Collects the constraints a table exposes for matching: table-level
    /// constraints plus column-level PRIMARY KEY and UNIQUE promoted to
    /// synthetic single-column table constraints. When `other` is given,
    /// column-level REFERENCES of columns absent from `other` are lifted
    /// too, so a freshly added column's foreign key shows up as a
    /// constraint addition.
    fn collect_matchable(&self, table: &TableDef, other: Option<&TableDef>) -> Vec<Matchable> {
        let mut items = Vec::new();
        for element in &table.elements {
            match element {
                TableElement::Constraint(c) => items.push(Matchable {
                    name: c.name.clone(),
                    kind: c.kind.clone(),
                    inline: false,
                    column: None,
                }),
                TableElement::Column(col) => {
                    let column_is_new =
                        other.is_some_and(|o| self.find_column(o, &col.name).is_none());
                    for cc in &col.constraints {
                        match &cc.kind {
                            ColumnConstraintKind::PrimaryKey => items.push(Matchable {
                                name: cc.name.clone(),
                                kind: TableConstraintKind::PrimaryKey {
                                    columns: vec![col.name.clone()],
                                    without_overlaps: false,
                                },
                                inline: true,
                                column: Some(col.name.clone()),
                            }),
                            ColumnConstraintKind::Unique => items.push(Matchable {
                                name: cc.name.clone(),
                                kind: TableConstraintKind::Unique {
                                    columns: vec![col.name.clone()],
                                    nulls_distinct: None,
                                    without_overlaps: false,
                                },
                                inline: true,
                                column: Some(col.name.clone()),
                            }),
                            ColumnConstraintKind::References {
                                table: ref_table,
                                column: ref_column,
                                match_kind,
                                on_delete,
                                on_update,
                            } if column_is_new => items.push(Matchable {
                                name: cc.name.clone(),
                                kind: TableConstraintKind::ForeignKey {
                                    columns: vec![col.name.clone()],
                                    period: false,
                                    ref_table: ref_table.clone(),
                                    ref_columns: ref_column.iter().cloned().collect(),
                                    ref_period: false,
                                    match_kind: *match_kind,
                                    on_delete: *on_delete,
                                    on_update: *on_update,
                                    set_columns_on_delete: Vec::new(),
                                    set_columns_on_update: Vec::new(),
                                },
                                inline: true,
                                column: Some(col.name.clone()),
                            }),
                            _ => {}
                        }
                    }
                }
                TableElement::Like(_) => {}
            }
        }
        items
    }

    fn constraints_equivalent(&self, a: &Matchable, b: &Matchable) -> bool {
        if std::mem::discriminant(&a.kind) != std::mem::discriminant(&b.kind) {
            return false;
        }
        if !self.config.ignore_constraint_names {
            let names_ok = match (&a.name, &b.name) {
                (None, None) => true,
                (Some(x), Some(y)) => self.names_equal(x, y),
                _ => false,
            };
            if !names_ok {
                return false;
            }
        }
        self.payloads_equal(&a.kind, &b.kind)
    }

    fn payloads_equal(&self, a: &TableConstraintKind, b: &TableConstraintKind) -> bool {
        use TableConstraintKind as K;
        match (a, b) {
            (K::Check { expr: ea, .. }, K::Check { expr: eb, .. }) => self.exprs_equal(ea, eb),
            (
                K::Unique {
                    columns: ca,
                    nulls_distinct: na,
                    without_overlaps: oa,
                },
                K::Unique {
                    columns: cb,
                    nulls_distinct: nb,
                    without_overlaps: ob,
                },
            ) => {
                self.name_lists_equal(ca, cb)
                    && oa == ob
                    && na.unwrap_or(true) == nb.unwrap_or(true)
            }
            (
                K::PrimaryKey {
                    columns: ca,
                    without_overlaps: oa,
                },
                K::PrimaryKey {
                    columns: cb,
                    without_overlaps: ob,
                },
            ) => self.name_lists_equal(ca, cb) && oa == ob,
            (
                K::ForeignKey {
                    columns: ca,
                    period: pa,
                    ref_table: ta,
                    ref_columns: ra,
                    ref_period: rpa,
                    match_kind: ma,
                    on_delete: da,
                    on_update: ua,
                    set_columns_on_delete: sda,
                    set_columns_on_update: sua,
                },
                K::ForeignKey {
                    columns: cb,
                    period: pb,
                    ref_table: tb,
                    ref_columns: rb,
                    ref_period: rpb,
                    match_kind: mb,
                    on_delete: db,
                    on_update: ub,
                    set_columns_on_delete: sdb,
                    set_columns_on_update: sub,
                },
            ) => {
                self.names_equal(ta, tb)
                    && self.name_lists_equal(ca, cb)
                    && self.name_lists_equal(ra, rb)
                    && pa == pb
                    && rpa == rpb
                    && ma.unwrap_or(FkMatch::Simple) == mb.unwrap_or(FkMatch::Simple)
                    && da.unwrap_or(FkAction::NoAction) == db.unwrap_or(FkAction::NoAction)
                    && ua.unwrap_or(FkAction::NoAction) == ub.unwrap_or(FkAction::NoAction)
                    && self.name_lists_equal(sda, sdb)
                    && self.name_lists_equal(sua, sub)
            }
            (
                K::Exclude {
                    method: ma,
                    elements: ea,
                    predicate: pa,
                },
                K::Exclude {
                    method: mb,
                    elements: eb,
                    predicate: pb,
                },
            ) => {
                if !self.opt_names_equal(ma.as_deref(), mb.as_deref()) || ea.len() != eb.len() {
                    return false;
                }
                let predicates_ok = match (pa, pb) {
                    (None, None) => true,
                    (Some(x), Some(y)) => self.exprs_equal(x, y),
                    _ => false,
                };
                predicates_ok
                    && ea.iter().zip(eb.iter()).all(|(x, y)| {
                        self.exprs_equal(&x.expr, &y.expr)
                            && self.opt_names_equal(x.collation.as_deref(), y.collation.as_deref())
                            && self.opt_names_equal(x.opclass.as_deref(), y.opclass.as_deref())
                            && x.sort_order == y.sort_order
                            && x.nulls_order == y.nulls_order
                            && x.operator.trim() == y.operator.trim()
                    })
            }
            (K::NotNull { column: ca }, K::NotNull { column: cb }) => self.names_equal(ca, cb),
            _ => false,
        }
    }

    /// Pass 2 of constraint matching: a still-unmatched table-level
    /// PRIMARY KEY or UNIQUE over N columns on the `wide` side absorbs N
    /// unmatched single-column inline constraints of the same kind on
    /// the `narrow` side when those cover its columns exactly once.
    fn match_n_to_one(
        &self,
        wide: &[Matchable],
        narrow: &[Matchable],
        wide_matched: &mut [bool],
        narrow_matched: &mut [bool],
    ) {
        for (wi, item) in wide.iter().enumerate() {
            if wide_matched[wi] || item.inline {
                continue;
            }
            let (columns, is_pk) = match &item.kind {
                TableConstraintKind::PrimaryKey { columns, .. } => (columns, true),
                TableConstraintKind::Unique { columns, .. } => (columns, false),
                _ => continue,
            };
            if columns.is_empty() {
                continue;
            }

            let mut picks: Vec<usize> = Vec::with_capacity(columns.len());
            let mut covered = true;
            for column in columns {
                let found = narrow.iter().enumerate().find(|(ni, n)| {
                    !narrow_matched[*ni]
                        && !picks.contains(ni)
                        && n.inline
                        && match (&n.kind, is_pk) {
                            (TableConstraintKind::PrimaryKey { columns: nc, .. }, true)
                            | (TableConstraintKind::Unique { columns: nc, .. }, false) => {
                                nc.len() == 1 && self.names_equal(&nc[0], column)
                            }
                            _ => false,
                        }
                });
                match found {
                    Some((ni, _)) => picks.push(ni),
                    None => {
                        covered = false;
                        break;
                    }
                }
            }

            if covered && picks.len() == columns.len() {
                wide_matched[wi] = true;
                for ni in picks {
                    narrow_matched[ni] = true;
                }
            }
        }
    }

    // Equality helpers bound to the configuration

    fn names_equal(&self, a: &str, b: &str) -> bool {
        normalize::names_equal(a, b, self.config.case_sensitive)
    }

    fn opt_names_equal(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(x), Some(y)) => self.names_equal(x, y),
            _ => false,
        }
    }

    fn name_lists_equal(&self, a: &[String], b: &[String]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b.iter())
                .all(|(x, y)| self.names_equal(x, y))
    }

    fn exprs_equal(&self, a: &str, b: &str) -> bool {
        normalize::exprs_equal(a, b, self.config.ignore_whitespace)
    }

    fn find_column<'t>(&self, table: &'t TableDef, name: &str) -> Option<&'t Column> {
        table.columns().find(|c| self.names_equal(&c.name, name))
    }

    fn table_included(&self, name: &str) -> bool {
        let folded = name.to_lowercase();
        if !self.config.include_patterns.is_empty()
            && !self
                .config
                .include_patterns
                .iter()
                .any(|p| folded.contains(&p.to_lowercase()))
        {
            return false;
        }
        !self
            .config
            .exclude_patterns
            .iter()
            .any(|p| folded.contains(&p.to_lowercase()))
    }

    fn validate(&self, schema: &Schema) -> CompareResult<()> {
        let mut seen: Vec<String> = Vec::with_capacity(schema.tables.len());
        for table in &schema.tables {
            let folded = normalize::fold_name(&table.name, self.config.case_sensitive);
            if seen.contains(&folded) {
                return Err(CompareError::DuplicateTable(
                    schema.name.clone(),
                    table.name.clone(),
                ));
            }
            seen.push(folded);
        }
        Ok(())
    }
}

/// A constraint in matchable form: table-level constraints verbatim,
/// inline PRIMARY KEY / UNIQUE / lifted REFERENCES as synthetic
/// single-column table constraints
#[derive(Debug, Clone)]
struct Matchable {
    name: Option<String>,
    kind: TableConstraintKind,
    inline: bool,
    column: Option<String>,
}

impl Matchable {
    fn to_constraint(&self) -> TableConstraint {
        TableConstraint {
            name: self.name.clone(),
            kind: self.kind.clone(),
            deferrability: Deferrability::default(),
        }
    }
}

fn persistence_label(p: Persistence) -> &'static str {
    match p {
        Persistence::Normal => "normal",
        Persistence::Temporary => "temporary",
        Persistence::Unlogged => "unlogged",
    }
}

fn nullable_label(nullable: bool) -> &'static str {
    if nullable { "NULL" } else { "NOT NULL" }
}

fn none_marker() -> String {
    "(none)".to_string()
}

fn table_kind_label(kind: &TableKind) -> String {
    match kind {
        TableKind::Regular => "regular table".to_string(),
        TableKind::PartitionOf { parent, .. } => format!("partition of {parent}"),
        TableKind::TypedOf { type_name } => format!("typed table of {type_name}"),
    }
}

fn same_table_kind(a: &TableKind, b: &TableKind) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn partition_label(spec: &PartitionSpec) -> String {
    format!("{} ({})", spec.method, spec.key)
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        none_marker()
    } else {
        names.join(", ")
    }
}

fn render_params(params: &[(String, String)]) -> String {
    if params.is_empty() {
        none_marker()
    } else {
        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn storage_params_equal(a: &[(String, String)], b: &[(String, String)]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka.eq_ignore_ascii_case(kb) && va == vb)
}

/// Short rendering of a constraint for diff entries and reports
pub(crate) fn describe_constraint(kind: &TableConstraintKind) -> String {
    match kind {
        TableConstraintKind::Check { expr, .. } => format!("CHECK ({expr})"),
        TableConstraintKind::Unique { columns, .. } => {
            format!("UNIQUE ({})", columns.join(", "))
        }
        TableConstraintKind::PrimaryKey { columns, .. } => {
            format!("PRIMARY KEY ({})", columns.join(", "))
        }
        TableConstraintKind::ForeignKey {
            columns,
            ref_table,
            ref_columns,
            ..
        } => {
            if ref_columns.is_empty() {
                format!("FOREIGN KEY ({}) REFERENCES {ref_table}", columns.join(", "))
            } else {
                format!(
                    "FOREIGN KEY ({}) REFERENCES {ref_table} ({})",
                    columns.join(", "),
                    ref_columns.join(", ")
                )
            }
        }
        TableConstraintKind::Exclude { method, elements, .. } => {
            let method = method.as_deref().unwrap_or("gist");
            format!("EXCLUDE USING {method} ({} elements)", elements.len())
        }
        TableConstraintKind::NotNull { column } => format!("NOT NULL {column}"),
    }
}
