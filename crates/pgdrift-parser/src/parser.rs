//! Recursive-descent parser for PostgreSQL `CREATE TABLE` statements
//!
//! The parser keeps one token of lookahead over the lexer and builds one
//! `TableDef` per statement. Errors never abort the whole parse: each
//! diagnostic is recorded with its line and column, the parser enters
//! panic mode, resynchronizes at the next statement boundary (a `;` or a
//! top-level `CREATE`/`ALTER`/`DROP`), and keeps going. Diffing can then
//! proceed over whatever well-formed tables were produced.
//!
//! Expressions in defaults, checks, and generated columns are captured
//! as verbatim source text; no expression tree is built.

use std::fmt;

use thiserror::Error;

use pgdrift_core::{
    Column, ColumnConstraint, ColumnConstraintKind, Deferrability, ExcludeElement, FkAction,
    FkMatch, GeneratedKind, LikeClause, LikeOption, NullsOrder, OnCommit, PartitionMethod,
    PartitionSpec, Persistence, Schema, SequenceOptions, SortOrder, StorageKind, TableConstraint,
    TableConstraintKind, TableDef, TableElement, TableKind,
};

use crate::keyword::Keyword;
use crate::lexer::{Lexer, Token, TokenKind};

/// Words that terminate an unparenthesized DEFAULT expression when they
/// appear at parenthesis depth zero
const DEFAULT_EXPR_STOP_WORDS: &[&str] = &[
    "check",
    "collate",
    "compression",
    "constraint",
    "default",
    "deferrable",
    "enforced",
    "generated",
    "initially",
    "not",
    "null",
    "primary",
    "references",
    "storage",
    "unique",
];

/// A diagnostic produced while lexing or parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Outcome of parsing a DDL source: the tables that parsed plus every
/// diagnostic that was recorded along the way
#[derive(Debug)]
pub struct ParseResult {
    pub schema: Schema,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// True when no diagnostic was recorded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses a DDL source into a schema named `public`
pub fn parse_schema(source: &str) -> ParseResult {
    parse_schema_named(source, "public")
}

/// Parses a DDL source into a schema with the given name
pub fn parse_schema_named(source: &str, schema_name: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let mut schema = Schema::new(schema_name);

    loop {
        while parser.check(TokenKind::Semicolon) {
            parser.advance();
        }
        if parser.at_eof() {
            break;
        }

        if parser.current.is_keyword(Keyword::Create) {
            let statement_line = parser.current.line;
            let parsed = parser.parse_create_statement();
            if parser.panic_mode {
                parser.synchronize();
            }
            if let Some(table) = parsed {
                tracing::debug!(table = %table.name, "parsed CREATE TABLE");
                for violation in table.violations() {
                    parser.report(statement_line, violation.to_string());
                }
                if let Err(err) = schema.push_table(table) {
                    parser.report(statement_line, err.to_string());
                }
            }
        } else {
            // Not a CREATE statement; other DDL is outside our scope and
            // skipped wholesale.
            tracing::debug!(token = %parser.current.text, "skipping non-CREATE statement");
            parser.skip_statement();
        }
    }

    ParseResult {
        schema,
        errors: parser.errors,
    }
}

/// Recursive-descent parser with one-token lookahead
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    panic_mode: bool,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(source),
            current: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                start: 0,
                line: 1,
                column: 1,
            },
            previous: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                start: 0,
                line: 1,
                column: 1,
            },
            panic_mode: false,
            errors: Vec::new(),
        };
        parser.current = parser.fetch_token();
        parser
    }

    /// Diagnostics recorded so far
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    // Statement level

    /// Parses one `CREATE ...` statement with the cursor on `CREATE`.
    /// Returns `None` when the statement was not a table, or when an
    /// error forced resynchronization.
    fn parse_create_statement(&mut self) -> Option<TableDef> {
        self.advance(); // CREATE

        let mut persistence = Persistence::Normal;
        loop {
            match self.current.kind {
                TokenKind::Keyword(Keyword::Global) | TokenKind::Keyword(Keyword::Local) => {
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Temp) | TokenKind::Keyword(Keyword::Temporary) => {
                    persistence = Persistence::Temporary;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Unlogged) => {
                    persistence = Persistence::Unlogged;
                    self.advance();
                }
                _ => break,
            }
        }

        if !self.current.is_keyword(Keyword::Table) {
            // CREATE INDEX, CREATE SEQUENCE, and friends
            self.skip_statement();
            return None;
        }
        self.advance();

        if self.match_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not, "NOT after IF");
            self.expect_keyword(Keyword::Exists, "EXISTS after IF NOT");
        }

        let name = match self.qualified_name("table name") {
            Some(name) => name,
            None => {
                self.synchronize();
                return None;
            }
        };

        let mut table = TableDef::new(name);
        table.persistence = persistence;

        if self.match_keyword(Keyword::Of) {
            let type_name = self.qualified_name("type name")?;
            table.kind = TableKind::TypedOf { type_name };
            if self.check(TokenKind::LParen) {
                // typed-table element list, accepted but not modeled
                self.capture_parenthesized();
            }
        } else if self.match_keyword(Keyword::Partition) {
            self.expect_keyword(Keyword::Of, "OF after PARTITION");
            let parent = self.qualified_name("parent table name")?;
            let bound = self.capture_raw_until(&["with", "tablespace", "using"]);
            table.kind = TableKind::PartitionOf { parent, bound };
        } else {
            if !self.expect_kind(TokenKind::LParen, "'(' to open the table body") {
                self.synchronize();
                return None;
            }
            if !self.check(TokenKind::RParen) {
                loop {
                    self.parse_table_element(&mut table);
                    if self.panic_mode {
                        self.synchronize();
                        return None;
                    }
                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
            }
            if !self.expect_kind(TokenKind::RParen, "')' to close the table body") {
                self.synchronize();
                return None;
            }
        }

        self.parse_trailing_options(&mut table);
        if self.panic_mode {
            self.synchronize();
            return None;
        }

        if self.check(TokenKind::Semicolon) {
            self.advance();
        } else if !self.at_eof() {
            self.error_at_current("expected ';' after CREATE TABLE statement");
            self.synchronize();
        }

        Some(table)
    }

    fn parse_trailing_options(&mut self, table: &mut TableDef) {
        loop {
            match self.current.kind {
                TokenKind::Keyword(Keyword::Inherits) => {
                    self.advance();
                    self.expect_kind(TokenKind::LParen, "'(' after INHERITS");
                    loop {
                        if let Some(parent) = self.qualified_name("parent table name") {
                            table.inherits.push(parent);
                        } else {
                            return;
                        }
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect_kind(TokenKind::RParen, "')' after INHERITS list");
                }
                TokenKind::Keyword(Keyword::Partition) => {
                    self.advance();
                    self.expect_keyword(Keyword::By, "BY after PARTITION");
                    let method = match self.current.kind {
                        TokenKind::Keyword(Keyword::Range) => PartitionMethod::Range,
                        TokenKind::Keyword(Keyword::List) => PartitionMethod::List,
                        TokenKind::Keyword(Keyword::Hash) => PartitionMethod::Hash,
                        _ => {
                            self.error_at_current("expected RANGE, LIST, or HASH");
                            return;
                        }
                    };
                    self.advance();
                    let key = match self.capture_parenthesized() {
                        Some(key) => key,
                        None => return,
                    };
                    table.partition_by = Some(PartitionSpec { method, key });
                }
                TokenKind::Keyword(Keyword::With) => {
                    self.advance();
                    self.expect_kind(TokenKind::LParen, "'(' after WITH");
                    if !self.check(TokenKind::RParen) {
                        loop {
                            let Some(param) = self.parse_storage_parameter() else {
                                return;
                            };
                            table.storage_params.push(param);
                            if !self.match_kind(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect_kind(TokenKind::RParen, "')' after storage parameters");
                }
                TokenKind::Keyword(Keyword::Without) => {
                    self.advance();
                    // legacy WITHOUT OIDS, accepted and ignored
                    self.expect_keyword(Keyword::Oids, "OIDS after WITHOUT");
                }
                TokenKind::Keyword(Keyword::On) => {
                    self.advance();
                    self.expect_keyword(Keyword::Commit, "COMMIT after ON");
                    table.on_commit = match self.current.kind {
                        TokenKind::Keyword(Keyword::Drop) => {
                            self.advance();
                            Some(OnCommit::Drop)
                        }
                        TokenKind::Keyword(Keyword::Delete) => {
                            self.advance();
                            self.expect_keyword(Keyword::Rows, "ROWS after ON COMMIT DELETE");
                            Some(OnCommit::DeleteRows)
                        }
                        TokenKind::Keyword(Keyword::Preserve) => {
                            self.advance();
                            self.expect_keyword(Keyword::Rows, "ROWS after ON COMMIT PRESERVE");
                            Some(OnCommit::PreserveRows)
                        }
                        _ => {
                            self.error_at_current("expected DROP, DELETE ROWS, or PRESERVE ROWS");
                            return;
                        }
                    };
                }
                TokenKind::Keyword(Keyword::Tablespace) => {
                    self.advance();
                    table.tablespace = self.identifier("tablespace name");
                }
                _ => break,
            }
            if self.panic_mode {
                break;
            }
        }
    }

    fn parse_storage_parameter(&mut self) -> Option<(String, String)> {
        let mut key = self.identifier("storage parameter name")?;
        if self.match_kind(TokenKind::Dot) {
            let rest = self.identifier("storage parameter name")?;
            key = format!("{key}.{rest}");
        }
        if !self.match_kind(TokenKind::Equals) {
            // boolean parameters may omit the value
            return Some((key, "true".to_string()));
        }
        let value = match self.current.kind {
            TokenKind::Identifier
            | TokenKind::QuotedIdentifier
            | TokenKind::StringLiteral
            | TokenKind::Number
            | TokenKind::Keyword(_) => {
                let value = self.current.text.clone();
                self.advance();
                value
            }
            _ => {
                self.error_at_current("expected storage parameter value");
                return None;
            }
        };
        Some((key, value))
    }

    // Table elements

    fn parse_table_element(&mut self, table: &mut TableDef) {
        match self.current.kind {
            TokenKind::Keyword(Keyword::Constraint) => {
                self.advance();
                let name = self.identifier("constraint name");
                if let Some(mut constraint) = self.parse_table_constraint() {
                    constraint.name = name;
                    table.elements.push(TableElement::Constraint(constraint));
                }
            }
            TokenKind::Keyword(
                Keyword::Check
                | Keyword::Unique
                | Keyword::Primary
                | Keyword::Foreign
                | Keyword::Exclude
                | Keyword::Not,
            ) => {
                if let Some(constraint) = self.parse_table_constraint() {
                    table.elements.push(TableElement::Constraint(constraint));
                }
            }
            TokenKind::Keyword(Keyword::Like) => {
                self.advance();
                let Some(source) = self.qualified_name("source table after LIKE") else {
                    return;
                };
                let mut like = LikeClause {
                    table: source,
                    options: Vec::new(),
                };
                loop {
                    let including = match self.current.kind {
                        TokenKind::Keyword(Keyword::Including) => true,
                        TokenKind::Keyword(Keyword::Excluding) => false,
                        _ => break,
                    };
                    self.advance();
                    let option = match self.current.kind {
                        TokenKind::Keyword(_) | TokenKind::Identifier => {
                            let option = self.current.text.to_lowercase();
                            self.advance();
                            option
                        }
                        _ => {
                            self.error_at_current("expected LIKE option name");
                            return;
                        }
                    };
                    like.options.push(LikeOption { including, option });
                }
                table.elements.push(TableElement::Like(like));
            }
            TokenKind::Identifier | TokenKind::QuotedIdentifier => {
                if let Some(column) = self.parse_column_def() {
                    table.elements.push(TableElement::Column(column));
                }
            }
            _ => {
                self.error_at_current("expected a column definition or table constraint");
            }
        }
    }

    // Columns

    fn parse_column_def(&mut self) -> Option<Column> {
        let name = self.identifier("column name")?;
        let data_type = self.parse_data_type()?;
        let mut column = Column::new(name, data_type);
        let mut pending_name: Option<String> = None;

        loop {
            match self.current.kind {
                TokenKind::Keyword(Keyword::Constraint) => {
                    self.advance();
                    pending_name = self.identifier("constraint name");
                    if pending_name.is_none() {
                        return None;
                    }
                }
                TokenKind::Keyword(Keyword::Not) => {
                    self.advance();
                    match self.current.kind {
                        TokenKind::Keyword(Keyword::Null) => {
                            self.advance();
                            self.push_column_constraint(
                                &mut column,
                                &mut pending_name,
                                ColumnConstraintKind::NotNull,
                            );
                        }
                        TokenKind::Keyword(Keyword::Deferrable) => {
                            self.advance();
                            self.apply_column_deferrability(&mut column, |d| {
                                d.deferrable = Some(false)
                            });
                        }
                        TokenKind::Keyword(Keyword::Enforced) => {
                            self.advance();
                            self.apply_column_deferrability(&mut column, |d| {
                                d.enforced = Some(false)
                            });
                        }
                        _ => {
                            self.error_at_current("expected NULL, DEFERRABLE, or ENFORCED after NOT");
                            return None;
                        }
                    }
                }
                TokenKind::Keyword(Keyword::Null) => {
                    self.advance();
                    self.push_column_constraint(
                        &mut column,
                        &mut pending_name,
                        ColumnConstraintKind::Null,
                    );
                }
                TokenKind::Keyword(Keyword::Default) => {
                    let expr = self.capture_after_word(DEFAULT_EXPR_STOP_WORDS);
                    if expr.is_empty() {
                        self.error_at_current("expected expression after DEFAULT");
                        return None;
                    }
                    self.push_column_constraint(
                        &mut column,
                        &mut pending_name,
                        ColumnConstraintKind::Default { expr },
                    );
                }
                TokenKind::Keyword(Keyword::Check) => {
                    self.advance();
                    let expr = self.capture_parenthesized()?;
                    let no_inherit = self.parse_no_inherit();
                    self.push_column_constraint(
                        &mut column,
                        &mut pending_name,
                        ColumnConstraintKind::Check { expr, no_inherit },
                    );
                }
                TokenKind::Keyword(Keyword::Unique) => {
                    self.advance();
                    self.skip_unique_modifiers();
                    self.skip_index_parameters();
                    self.push_column_constraint(
                        &mut column,
                        &mut pending_name,
                        ColumnConstraintKind::Unique,
                    );
                }
                TokenKind::Keyword(Keyword::Primary) => {
                    self.advance();
                    self.expect_keyword(Keyword::Key, "KEY after PRIMARY");
                    self.skip_index_parameters();
                    self.push_column_constraint(
                        &mut column,
                        &mut pending_name,
                        ColumnConstraintKind::PrimaryKey,
                    );
                }
                TokenKind::Keyword(Keyword::References) => {
                    self.advance();
                    let Some(ref_table) = self.qualified_name("referenced table") else {
                        return None;
                    };
                    let mut ref_column = None;
                    if self.match_kind(TokenKind::LParen) {
                        ref_column = self.identifier("referenced column");
                        self.expect_kind(TokenKind::RParen, "')' after referenced column");
                    }
                    let actions = self.parse_reference_actions();
                    self.push_column_constraint(
                        &mut column,
                        &mut pending_name,
                        ColumnConstraintKind::References {
                            table: ref_table,
                            column: ref_column,
                            match_kind: actions.match_kind,
                            on_delete: actions.on_delete,
                            on_update: actions.on_update,
                        },
                    );
                }
                TokenKind::Keyword(Keyword::Generated) => {
                    self.advance();
                    let kind = self.parse_generated()?;
                    self.push_column_constraint(&mut column, &mut pending_name, kind);
                }
                TokenKind::Keyword(Keyword::Collate) => {
                    self.advance();
                    column.collation = self.qualified_name("collation name");
                }
                TokenKind::Keyword(Keyword::Compression) => {
                    self.advance();
                    column.compression = self.identifier("compression method");
                }
                TokenKind::Keyword(Keyword::Storage) => {
                    self.advance();
                    column.storage = match self.current.kind {
                        TokenKind::Keyword(Keyword::Plain) => StorageKind::Plain,
                        TokenKind::Keyword(Keyword::External) => StorageKind::External,
                        TokenKind::Keyword(Keyword::Extended) => StorageKind::Extended,
                        TokenKind::Keyword(Keyword::Main) => StorageKind::Main,
                        TokenKind::Keyword(Keyword::Default) => StorageKind::Default,
                        _ => {
                            self.error_at_current(
                                "expected PLAIN, EXTERNAL, EXTENDED, MAIN, or DEFAULT",
                            );
                            return None;
                        }
                    };
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Deferrable) => {
                    self.advance();
                    self.apply_column_deferrability(&mut column, |d| d.deferrable = Some(true));
                }
                TokenKind::Keyword(Keyword::Initially) => {
                    self.advance();
                    let deferred = match self.current.kind {
                        TokenKind::Keyword(Keyword::Deferred) => true,
                        TokenKind::Keyword(Keyword::Immediate) => false,
                        _ => {
                            self.error_at_current("expected DEFERRED or IMMEDIATE");
                            return None;
                        }
                    };
                    self.advance();
                    self.apply_column_deferrability(&mut column, |d| {
                        d.initially_deferred = Some(deferred)
                    });
                }
                TokenKind::Keyword(Keyword::Enforced) => {
                    self.advance();
                    self.apply_column_deferrability(&mut column, |d| d.enforced = Some(true));
                }
                _ => break,
            }
            if self.panic_mode {
                return None;
            }
        }

        Some(column)
    }

    fn push_column_constraint(
        &mut self,
        column: &mut Column,
        pending_name: &mut Option<String>,
        kind: ColumnConstraintKind,
    ) {
        column.constraints.push(ColumnConstraint {
            name: pending_name.take(),
            kind,
            deferrability: Deferrability::default(),
        });
    }

    fn apply_column_deferrability(
        &mut self,
        column: &mut Column,
        apply: impl FnOnce(&mut Deferrability),
    ) {
        match column.constraints.last_mut() {
            Some(constraint) => apply(&mut constraint.deferrability),
            None => self.error_at_current("deferrability clause without a preceding constraint"),
        }
    }

    /// Parses the tail of `GENERATED ...` into a constraint kind
    fn parse_generated(&mut self) -> Option<ColumnConstraintKind> {
        match self.current.kind {
            TokenKind::Keyword(Keyword::Always) => {
                self.advance();
                if !self.expect_keyword(Keyword::As, "AS after GENERATED ALWAYS") {
                    return None;
                }
                if self.match_keyword(Keyword::Identity) {
                    let sequence = self.parse_sequence_options()?;
                    Some(ColumnConstraintKind::GeneratedIdentity {
                        kind: GeneratedKind::Always,
                        sequence,
                    })
                } else if self.check(TokenKind::LParen) {
                    let expr = self.capture_parenthesized()?;
                    let stored = match self.current.kind {
                        TokenKind::Keyword(Keyword::Stored) => true,
                        TokenKind::Keyword(Keyword::Virtual) => false,
                        _ => {
                            self.error_at_current("expected STORED or VIRTUAL");
                            return None;
                        }
                    };
                    self.advance();
                    Some(ColumnConstraintKind::GeneratedExpr { expr, stored })
                } else {
                    self.error_at_current("expected IDENTITY or a generation expression");
                    None
                }
            }
            TokenKind::Keyword(Keyword::By) => {
                self.advance();
                self.expect_keyword(Keyword::Default, "DEFAULT after GENERATED BY");
                self.expect_keyword(Keyword::As, "AS after GENERATED BY DEFAULT");
                self.expect_keyword(Keyword::Identity, "IDENTITY");
                if self.panic_mode {
                    return None;
                }
                let sequence = self.parse_sequence_options()?;
                Some(ColumnConstraintKind::GeneratedIdentity {
                    kind: GeneratedKind::ByDefault,
                    sequence,
                })
            }
            _ => {
                self.error_at_current("expected ALWAYS or BY DEFAULT after GENERATED");
                None
            }
        }
    }

    fn parse_sequence_options(&mut self) -> Option<SequenceOptions> {
        let mut options = SequenceOptions::default();
        if !self.match_kind(TokenKind::LParen) {
            return Some(options);
        }
        loop {
            match self.current.kind {
                TokenKind::Keyword(Keyword::Start) => {
                    self.advance();
                    self.match_keyword(Keyword::With);
                    options.start = Some(self.integer_value()?);
                }
                TokenKind::Keyword(Keyword::Increment) => {
                    self.advance();
                    self.match_keyword(Keyword::By);
                    options.increment = Some(self.integer_value()?);
                }
                TokenKind::Keyword(Keyword::Minvalue) => {
                    self.advance();
                    options.min_value = Some(self.integer_value()?);
                }
                TokenKind::Keyword(Keyword::Maxvalue) => {
                    self.advance();
                    options.max_value = Some(self.integer_value()?);
                }
                TokenKind::Keyword(Keyword::Cache) => {
                    self.advance();
                    options.cache = Some(self.integer_value()?);
                }
                TokenKind::Keyword(Keyword::Cycle) => {
                    self.advance();
                    options.cycle = Some(true);
                }
                TokenKind::Keyword(Keyword::No) => {
                    self.advance();
                    match self.current.kind {
                        TokenKind::Keyword(Keyword::Cycle) => {
                            options.cycle = Some(false);
                            self.advance();
                        }
                        TokenKind::Keyword(Keyword::Minvalue)
                        | TokenKind::Keyword(Keyword::Maxvalue) => {
                            self.advance();
                        }
                        _ => {
                            self.error_at_current("expected CYCLE, MINVALUE, or MAXVALUE after NO");
                            return None;
                        }
                    }
                }
                TokenKind::Keyword(Keyword::Owned) => {
                    self.advance();
                    self.expect_keyword(Keyword::By, "BY after OWNED");
                    self.qualified_name("sequence owner")?;
                }
                TokenKind::RParen => break,
                _ => {
                    self.error_at_current("expected a sequence option");
                    return None;
                }
            }
        }
        self.expect_kind(TokenKind::RParen, "')' after sequence options");
        Some(options)
    }

    // Table constraints

    fn parse_table_constraint(&mut self) -> Option<TableConstraint> {
        let kind = match self.current.kind {
            TokenKind::Keyword(Keyword::Check) => {
                self.advance();
                let expr = self.capture_parenthesized()?;
                let no_inherit = self.parse_no_inherit();
                TableConstraintKind::Check { expr, no_inherit }
            }
            TokenKind::Keyword(Keyword::Unique) => {
                self.advance();
                let nulls_distinct = self.parse_nulls_distinct();
                let (columns, without_overlaps) = self.parse_key_columns()?;
                self.skip_index_parameters();
                TableConstraintKind::Unique {
                    columns,
                    nulls_distinct,
                    without_overlaps,
                }
            }
            TokenKind::Keyword(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key, "KEY after PRIMARY");
                let (columns, without_overlaps) = self.parse_key_columns()?;
                self.skip_index_parameters();
                TableConstraintKind::PrimaryKey {
                    columns,
                    without_overlaps,
                }
            }
            TokenKind::Keyword(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key, "KEY after FOREIGN");
                let (columns, period) = self.parse_fk_columns()?;
                self.expect_keyword(Keyword::References, "REFERENCES");
                if self.panic_mode {
                    return None;
                }
                let ref_table = self.qualified_name("referenced table")?;
                let (ref_columns, ref_period) = if self.check(TokenKind::LParen) {
                    self.parse_fk_columns()?
                } else {
                    (Vec::new(), false)
                };
                let actions = self.parse_reference_actions();
                TableConstraintKind::ForeignKey {
                    columns,
                    period,
                    ref_table,
                    ref_columns,
                    ref_period,
                    match_kind: actions.match_kind,
                    on_delete: actions.on_delete,
                    on_update: actions.on_update,
                    set_columns_on_delete: actions.set_columns_on_delete,
                    set_columns_on_update: actions.set_columns_on_update,
                }
            }
            TokenKind::Keyword(Keyword::Exclude) => {
                self.advance();
                let method = if self.match_keyword(Keyword::Using) {
                    self.identifier("index method")
                } else {
                    None
                };
                self.expect_kind(TokenKind::LParen, "'(' after EXCLUDE");
                let mut elements = Vec::new();
                loop {
                    elements.push(self.parse_exclude_element()?);
                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect_kind(TokenKind::RParen, "')' after exclusion elements");
                let predicate = if self.match_keyword(Keyword::Where) {
                    Some(self.capture_parenthesized()?)
                } else {
                    None
                };
                TableConstraintKind::Exclude {
                    method,
                    elements,
                    predicate,
                }
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                self.expect_keyword(Keyword::Null, "NULL after NOT");
                let column = self.identifier("column name after NOT NULL")?;
                TableConstraintKind::NotNull { column }
            }
            _ => {
                self.error_at_current("expected a table constraint");
                return None;
            }
        };

        let mut constraint = TableConstraint::new(kind);
        self.parse_deferrability(&mut constraint.deferrability);
        Some(constraint)
    }

    fn parse_deferrability(&mut self, deferrability: &mut Deferrability) {
        loop {
            match self.current.kind {
                TokenKind::Keyword(Keyword::Deferrable) => {
                    self.advance();
                    deferrability.deferrable = Some(true);
                }
                TokenKind::Keyword(Keyword::Not) => {
                    self.advance();
                    match self.current.kind {
                        TokenKind::Keyword(Keyword::Deferrable) => {
                            self.advance();
                            deferrability.deferrable = Some(false);
                        }
                        TokenKind::Keyword(Keyword::Enforced) => {
                            self.advance();
                            deferrability.enforced = Some(false);
                        }
                        _ => {
                            self.error_at_current("expected DEFERRABLE or ENFORCED after NOT");
                            return;
                        }
                    }
                }
                TokenKind::Keyword(Keyword::Initially) => {
                    self.advance();
                    match self.current.kind {
                        TokenKind::Keyword(Keyword::Deferred) => {
                            self.advance();
                            deferrability.initially_deferred = Some(true);
                        }
                        TokenKind::Keyword(Keyword::Immediate) => {
                            self.advance();
                            deferrability.initially_deferred = Some(false);
                        }
                        _ => {
                            self.error_at_current("expected DEFERRED or IMMEDIATE");
                            return;
                        }
                    }
                }
                TokenKind::Keyword(Keyword::Enforced) => {
                    self.advance();
                    deferrability.enforced = Some(true);
                }
                _ => break,
            }
        }
    }

    fn parse_no_inherit(&mut self) -> bool {
        if self.current.is_keyword(Keyword::No) {
            self.advance();
            self.expect_keyword(Keyword::Inherit, "INHERIT after NO");
            true
        } else {
            false
        }
    }

    fn parse_nulls_distinct(&mut self) -> Option<bool> {
        if !self.match_keyword(Keyword::Nulls) {
            return None;
        }
        let not = self.match_keyword(Keyword::Not);
        self.expect_keyword(Keyword::Distinct, "DISTINCT after NULLS");
        Some(!not)
    }

    /// `( col [, col]* [WITHOUT OVERLAPS] )` for UNIQUE and PRIMARY KEY
    fn parse_key_columns(&mut self) -> Option<(Vec<String>, bool)> {
        if !self.expect_kind(TokenKind::LParen, "'(' before column list") {
            return None;
        }
        let mut columns = Vec::new();
        let mut without_overlaps = false;
        loop {
            columns.push(self.identifier("column name")?);
            if self.match_keyword(Keyword::Without) {
                self.expect_keyword(Keyword::Overlaps, "OVERLAPS after WITHOUT");
                without_overlaps = true;
                break;
            }
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        self.expect_kind(TokenKind::RParen, "')' after column list");
        Some((columns, without_overlaps))
    }

    /// `( col [, col]* [, PERIOD col] )` for FOREIGN KEY sides
    fn parse_fk_columns(&mut self) -> Option<(Vec<String>, bool)> {
        if !self.expect_kind(TokenKind::LParen, "'(' before column list") {
            return None;
        }
        let mut columns = Vec::new();
        let mut period = false;
        loop {
            if self.match_keyword(Keyword::Period) {
                columns.push(self.identifier("PERIOD column name")?);
                period = true;
                break;
            }
            columns.push(self.identifier("column name")?);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        self.expect_kind(TokenKind::RParen, "')' after column list");
        Some((columns, period))
    }

    fn parse_exclude_element(&mut self) -> Option<ExcludeElement> {
        let expr = if self.check(TokenKind::LParen) {
            format!("({})", self.capture_parenthesized()?)
        } else {
            let name = self.identifier("exclusion element")?;
            if self.check(TokenKind::LParen) {
                // function-call element, e.g. daterange(arrival, departure)
                format!("{name}({})", self.capture_parenthesized()?)
            } else {
                name
            }
        };

        let collation = if self.match_keyword(Keyword::Collate) {
            self.qualified_name("collation name")
        } else {
            None
        };

        let opclass = if self.check(TokenKind::Identifier) {
            let opclass = self.current.text.clone();
            self.advance();
            Some(opclass)
        } else {
            None
        };

        let sort_order = match self.current.kind {
            TokenKind::Keyword(Keyword::Asc) => {
                self.advance();
                Some(SortOrder::Asc)
            }
            TokenKind::Keyword(Keyword::Desc) => {
                self.advance();
                Some(SortOrder::Desc)
            }
            _ => None,
        };

        let nulls_order = if self.match_keyword(Keyword::Nulls) {
            match self.current.kind {
                TokenKind::Keyword(Keyword::First) => {
                    self.advance();
                    Some(NullsOrder::First)
                }
                TokenKind::Keyword(Keyword::Last) => {
                    self.advance();
                    Some(NullsOrder::Last)
                }
                _ => {
                    self.error_at_current("expected FIRST or LAST after NULLS");
                    return None;
                }
            }
        } else {
            None
        };

        if !self.current.is_keyword(Keyword::With) {
            self.error_at_current("expected WITH <operator> in exclusion element");
            return None;
        }
        let operator = self.capture_after_word(&[]);
        let operator = operator
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        if operator.is_empty() {
            self.error_at_current("expected operator after WITH");
            return None;
        }

        Some(ExcludeElement {
            expr,
            collation,
            opclass,
            sort_order,
            nulls_order,
            operator,
        })
    }

    fn parse_reference_actions(&mut self) -> ReferenceActions {
        let mut actions = ReferenceActions::default();
        loop {
            if self.match_keyword(Keyword::Match) {
                actions.match_kind = match self.current.kind {
                    TokenKind::Keyword(Keyword::Full) => Some(FkMatch::Full),
                    TokenKind::Keyword(Keyword::Partial) => Some(FkMatch::Partial),
                    TokenKind::Keyword(Keyword::Simple) => Some(FkMatch::Simple),
                    _ => {
                        self.error_at_current("expected FULL, PARTIAL, or SIMPLE after MATCH");
                        return actions;
                    }
                };
                self.advance();
            } else if self.current.is_keyword(Keyword::On) {
                self.advance();
                match self.current.kind {
                    TokenKind::Keyword(Keyword::Delete) => {
                        self.advance();
                        let (action, set_columns) = match self.parse_fk_action() {
                            Some(parsed) => parsed,
                            None => return actions,
                        };
                        actions.on_delete = Some(action);
                        actions.set_columns_on_delete = set_columns;
                    }
                    TokenKind::Keyword(Keyword::Update) => {
                        self.advance();
                        let (action, set_columns) = match self.parse_fk_action() {
                            Some(parsed) => parsed,
                            None => return actions,
                        };
                        actions.on_update = Some(action);
                        actions.set_columns_on_update = set_columns;
                    }
                    _ => {
                        self.error_at_current("expected DELETE or UPDATE after ON");
                        return actions;
                    }
                }
            } else {
                break;
            }
        }
        actions
    }

    fn parse_fk_action(&mut self) -> Option<(FkAction, Vec<String>)> {
        match self.current.kind {
            TokenKind::Keyword(Keyword::Cascade) => {
                self.advance();
                Some((FkAction::Cascade, Vec::new()))
            }
            TokenKind::Keyword(Keyword::Restrict) => {
                self.advance();
                Some((FkAction::Restrict, Vec::new()))
            }
            TokenKind::Keyword(Keyword::No) => {
                self.advance();
                self.expect_keyword(Keyword::Action, "ACTION after NO");
                Some((FkAction::NoAction, Vec::new()))
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.advance();
                let action = match self.current.kind {
                    TokenKind::Keyword(Keyword::Null) => FkAction::SetNull,
                    TokenKind::Keyword(Keyword::Default) => FkAction::SetDefault,
                    _ => {
                        self.error_at_current("expected NULL or DEFAULT after SET");
                        return None;
                    }
                };
                self.advance();
                let mut set_columns = Vec::new();
                if self.match_kind(TokenKind::LParen) {
                    loop {
                        set_columns.push(self.identifier("column name")?);
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect_kind(TokenKind::RParen, "')' after column list");
                }
                Some((action, set_columns))
            }
            _ => {
                self.error_at_current("expected a referential action");
                None
            }
        }
    }

    /// Skips `NULLS [NOT] DISTINCT` on a column-level UNIQUE; the flag is
    /// not significant for column constraints
    fn skip_unique_modifiers(&mut self) {
        self.parse_nulls_distinct();
    }

    /// Skips `INCLUDE (...)` and `WITH (...)` index parameters; these are
    /// not significant for logical equivalence
    fn skip_index_parameters(&mut self) {
        if self.match_keyword(Keyword::Include) {
            self.capture_parenthesized();
        }
        if self.current.is_keyword(Keyword::With) {
            self.advance();
            self.capture_parenthesized();
        }
    }

    // Types

    fn parse_data_type(&mut self) -> Option<String> {
        let mut data_type = match self.current.kind {
            TokenKind::Identifier | TokenKind::QuotedIdentifier => {
                let base = self.current.text.clone();
                self.advance();
                base
            }
            _ => {
                self.error_at_current("expected a data type");
                return None;
            }
        };

        if self.match_kind(TokenKind::Dot) {
            let rest = self.identifier("type name")?;
            data_type = format!("{data_type}.{rest}");
        }

        // multi-word names: character varying, bit varying, double precision
        let lower = data_type.to_lowercase();
        if self.check(TokenKind::Identifier) {
            let next = self.current.text.to_lowercase();
            if (next == "varying" && matches!(lower.as_str(), "character" | "bit"))
                || (next == "precision" && lower == "double")
            {
                data_type.push(' ');
                data_type.push_str(&self.current.text);
                self.advance();
            }
        }

        if self.check(TokenKind::LParen) {
            let precision = self.capture_parenthesized()?;
            data_type.push_str(&format!("({precision})"));
        }

        // timestamp/time with or without time zone
        let base_lower = data_type.to_lowercase();
        if (base_lower.starts_with("timestamp") || base_lower.starts_with("time"))
            && matches!(
                self.current.kind,
                TokenKind::Keyword(Keyword::With) | TokenKind::Keyword(Keyword::Without)
            )
        {
            let with = self.current.is_keyword(Keyword::With);
            self.advance();
            let ok = self.expect_identifier_text("time") && self.expect_identifier_text("zone");
            if !ok {
                return None;
            }
            data_type.push_str(if with {
                " with time zone"
            } else {
                " without time zone"
            });
        }

        while self.check(TokenKind::LBracket) {
            self.advance();
            if self.check(TokenKind::Number) {
                let bound = self.current.text.clone();
                self.advance();
                self.expect_kind(TokenKind::RBracket, "']' after array bound");
                data_type.push_str(&format!("[{bound}]"));
            } else {
                self.expect_kind(TokenKind::RBracket, "']' after '['");
                data_type.push_str("[]");
            }
        }

        Some(data_type)
    }

    // Token plumbing

    fn fetch_token(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            if token.kind == TokenKind::Error {
                if !self.panic_mode {
                    self.errors.push(ParseError {
                        message: token.text.clone(),
                        line: token.line,
                        column: token.column,
                    });
                }
                continue;
            }
            return token;
        }
    }

    fn advance(&mut self) {
        let next = self.fetch_token();
        self.previous = std::mem::replace(&mut self.current, next);
    }

    /// Re-primes the lookahead after a raw capture moved the lexer
    fn refresh_lookahead(&mut self) {
        self.current = self.fetch_token();
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn at_eof(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.current.is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.match_kind(kind) {
            true
        } else {
            self.error_at_current(&format!("expected {what}"));
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, what: &str) -> bool {
        if self.match_keyword(keyword) {
            true
        } else {
            self.error_at_current(&format!("expected {what}"));
            false
        }
    }

    fn expect_identifier_text(&mut self, text: &str) -> bool {
        if self.check(TokenKind::Identifier) && self.current.text.eq_ignore_ascii_case(text) {
            self.advance();
            true
        } else {
            self.error_at_current(&format!("expected '{text}'"));
            false
        }
    }

    fn identifier(&mut self, what: &str) -> Option<String> {
        match self.current.kind {
            TokenKind::Identifier | TokenKind::QuotedIdentifier => {
                let text = self.current.text.clone();
                self.advance();
                Some(text)
            }
            _ => {
                self.error_at_current(&format!("expected {what}"));
                None
            }
        }
    }

    /// `name` or `schema.name`; only the last segment is kept
    fn qualified_name(&mut self, what: &str) -> Option<String> {
        let mut name = self.identifier(what)?;
        while self.match_kind(TokenKind::Dot) {
            name = self.identifier(what)?;
        }
        Some(name)
    }

    fn integer_value(&mut self) -> Option<i64> {
        if !self.check(TokenKind::Number) {
            self.error_at_current("expected a numeric value");
            return None;
        }
        let parsed = self.current.text.parse::<i64>();
        self.advance();
        match parsed {
            Ok(value) => Some(value),
            Err(_) => {
                self.error_at_current("numeric value out of range");
                None
            }
        }
    }

    // Raw capture helpers

    /// Captures balanced-parentheses text starting at the lookahead token
    fn capture_parenthesized(&mut self) -> Option<String> {
        self.lexer.rewind_to(&self.current);
        let captured = self.lexer.capture_parenthesized();
        self.refresh_lookahead();
        if captured.is_none() {
            self.error_at_current("expected '('");
        }
        captured
    }

    /// Consumes the current keyword rawly, then captures expression text
    /// after it. Used where the following characters may not be valid
    /// tokens (operators in defaults, exclusion operators).
    fn capture_after_word(&mut self, stop_words: &[&str]) -> String {
        self.lexer.rewind_to(&self.current);
        self.lexer.skip_word();
        let captured = self.lexer.capture_expression(stop_words);
        self.refresh_lookahead();
        captured
    }

    /// Captures raw text from the lookahead token up to a statement
    /// boundary or one of the stop words
    fn capture_raw_until(&mut self, stop_words: &[&str]) -> String {
        self.lexer.rewind_to(&self.current);
        let captured = self.lexer.capture_expression(stop_words);
        self.refresh_lookahead();
        captured
    }

    // Error handling

    fn error_at_current(&mut self, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors.push(ParseError {
            message: message.to_string(),
            line: self.current.line,
            column: self.current.column,
        });
    }

    fn report(&mut self, line: usize, message: String) {
        self.errors.push(ParseError {
            message,
            line,
            column: 1,
        });
    }

    /// Leaves panic mode and skips ahead to the next statement boundary
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.at_eof() {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            if matches!(
                self.current.kind,
                TokenKind::Keyword(Keyword::Create)
                    | TokenKind::Keyword(Keyword::Alter)
                    | TokenKind::Keyword(Keyword::Drop)
            ) {
                return;
            }
            self.advance();
        }
    }

    /// Skips a statement we do not parse, without recording an error
    fn skip_statement(&mut self) {
        self.advance();
        while !self.at_eof() {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            if matches!(
                self.current.kind,
                TokenKind::Keyword(Keyword::Create)
                    | TokenKind::Keyword(Keyword::Alter)
                    | TokenKind::Keyword(Keyword::Drop)
            ) {
                return;
            }
            self.advance();
        }
    }
}

/// Accumulated referential clauses of a REFERENCES / FOREIGN KEY tail
#[derive(Debug, Default)]
struct ReferenceActions {
    match_kind: Option<FkMatch>,
    on_delete: Option<FkAction>,
    on_update: Option<FkAction>,
    set_columns_on_delete: Vec<String>,
    set_columns_on_update: Vec<String>,
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tables, {} errors",
            self.schema.tables.len(),
            self.errors.len()
        )
    }
}
