//! pgdrift - compare PostgreSQL schemas and generate forward migrations
//!
//! Each side of the comparison is a `.sql` file, a directory of `.sql`
//! files, or a `postgres://` connection string. The tool prints a diff
//! report and can write the forward-migration script; it never executes
//! DDL itself.
//!
//! Exit codes: 0 when the schemas match, 1 when differences were found,
//! 2 on parse or connection errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pgdrift_core::Schema;
use pgdrift_introspect::introspect_schema;
use pgdrift_parser::{ParseError, parse_schema_named};
use pgdrift_schema_tools::{
    CompareConfig, MigrationConfig, MigrationGenerator, ReportConfig, ReportGenerator,
    SchemaComparator, Verbosity,
};

/// pgdrift - PostgreSQL schema drift detection and migration generation
#[derive(Parser, Debug)]
#[command(name = "pgdrift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a source schema against a target schema
    Diff(DiffArgs),
}

#[derive(clap::Args, Debug)]
struct DiffArgs {
    /// Source schema: a .sql file, a directory of .sql files, or a
    /// postgres:// connection string
    source: String,

    /// Target schema, same forms as the source
    target: String,

    /// Database schema name used for introspected sides
    #[arg(long, default_value = "public", env = "PGDRIFT_SCHEMA")]
    schema: String,

    /// Compare identifiers case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Compare type names verbatim instead of canonicalizing aliases
    #[arg(long)]
    no_normalize_types: bool,

    /// Match constraints by shape only, ignoring their names
    #[arg(long)]
    ignore_constraint_names: bool,

    /// Skip constraint comparison entirely
    #[arg(long)]
    no_constraints: bool,

    /// Only consider tables whose name contains this substring (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Skip tables whose name contains this substring (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Report verbosity
    #[arg(long, value_enum, default_value_t = VerbosityArg::Normal)]
    verbosity: VerbosityArg,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Group report lines by severity, most severe first
    #[arg(long)]
    group_by_severity: bool,

    /// Emit the diff as JSON instead of a report
    #[arg(long)]
    json: bool,

    /// Print the forward-migration SQL after the report
    #[arg(long)]
    sql: bool,

    /// Write the forward-migration SQL to this file
    #[arg(long, value_name = "PATH")]
    sql_out: Option<PathBuf>,

    /// Do not wrap the migration in BEGIN/COMMIT
    #[arg(long)]
    no_transaction: bool,

    /// Comment out destructive statements in the migration
    #[arg(long)]
    safe_mode: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Markdown,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VerbosityArg {
    Summary,
    Normal,
    Detailed,
    Verbose,
}

impl From<VerbosityArg> for Verbosity {
    fn from(value: VerbosityArg) -> Self {
        match value {
            VerbosityArg::Summary => Verbosity::Summary,
            VerbosityArg::Normal => Verbosity::Normal,
            VerbosityArg::Detailed => Verbosity::Detailed,
            VerbosityArg::Verbose => Verbosity::Verbose,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Diff(args) => match run_diff(&args).await {
            Ok(code) => code,
            Err(error) => {
                eprintln!("{} {error:#}", "Error:".red().bold());
                ExitCode::from(2)
            }
        },
    }
}

async fn run_diff(args: &DiffArgs) -> Result<ExitCode> {
    let (source, source_errors) = load_side(&args.source, &args.schema).await?;
    let (target, target_errors) = load_side(&args.target, &args.schema).await?;

    // Parser diagnostics come first, before any report output.
    let had_errors = !source_errors.is_empty() || !target_errors.is_empty();
    report_parse_errors(&args.source, &source_errors, args.no_color);
    report_parse_errors(&args.target, &target_errors, args.no_color);

    let comparator = SchemaComparator::with_config(compare_config(args));
    let diff = comparator.compare(&source, &target)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        let report = ReportGenerator::with_config(report_config(args)).generate(&diff);
        print!("{report}");
    }

    if args.sql || args.sql_out.is_some() {
        let migration = MigrationGenerator::with_config(migration_config(args)).generate(&diff)?;
        if let Some(path) = &args.sql_out {
            std::fs::write(path, &migration.forward_sql)
                .with_context(|| format!("writing {}", path.display()))?;
            let notice = format!(
                "Wrote {} statement(s) to {}",
                migration.statement_count,
                path.display()
            );
            if migration.has_destructive_changes {
                eprintln!("{} {notice} (contains destructive statements)", warn_tag(args));
            } else {
                eprintln!("{notice}");
            }
        }
        if args.sql {
            println!();
            print!("{}", migration.forward_sql);
        }
    }

    if had_errors {
        Ok(ExitCode::from(2))
    } else if diff.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Loads one side of the comparison: parse files or introspect a live
/// database, producing the same schema model either way
async fn load_side(input: &str, schema_name: &str) -> Result<(Schema, Vec<ParseError>)> {
    if input.starts_with("postgres://") || input.starts_with("postgresql://") {
        let schema = introspect(input, schema_name).await?;
        return Ok((schema, Vec::new()));
    }

    let sql = read_ddl(Path::new(input))?;
    let result = parse_schema_named(&sql, schema_name);
    Ok((result.schema, result.errors))
}

async fn introspect(url: &str, schema_name: &str) -> Result<Schema> {
    let (client, connection) = tokio_postgres::connect(url, tokio_postgres::NoTls)
        .await
        .context("connecting to database")?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::error!(%error, "connection task failed");
        }
    });
    let schema = introspect_schema(&client, schema_name).await?;
    Ok(schema)
}

/// Reads a single .sql file, or every .sql file under a directory in
/// path order
fn read_ddl(path: &Path) -> Result<String> {
    if path.is_file() {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    if path.is_dir() {
        let pattern = format!("{}/**/*.sql", path.display());
        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .context("invalid glob pattern")?
            .filter_map(|entry| entry.ok())
            .collect();
        files.sort();
        if files.is_empty() {
            bail!("no .sql files under {}", path.display());
        }
        let mut combined = String::new();
        for file in files {
            tracing::debug!(file = %file.display(), "reading DDL");
            combined.push_str(
                &std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
            );
            combined.push('\n');
        }
        return Ok(combined);
    }
    bail!("{} is neither a file, a directory, nor a connection string", path.display());
}

fn report_parse_errors(input: &str, errors: &[ParseError], no_color: bool) {
    for error in errors {
        let prefix = format!("{input}:");
        if no_color {
            eprintln!("{prefix} {error}");
        } else {
            eprintln!("{} {error}", prefix.yellow());
        }
    }
}

fn compare_config(args: &DiffArgs) -> CompareConfig {
    let mut config = CompareConfig::new();
    config.case_sensitive = args.case_sensitive;
    config.normalize_types = !args.no_normalize_types;
    config.ignore_constraint_names = args.ignore_constraint_names;
    config.compare_constraints = !args.no_constraints;
    config.include_patterns = args.include.clone();
    config.exclude_patterns = args.exclude.clone();
    config
}

fn report_config(args: &DiffArgs) -> ReportConfig {
    let mut config = ReportConfig::new().with_verbosity(args.verbosity.into());
    if matches!(args.format, FormatArg::Markdown) {
        config = config.markdown();
    }
    if !args.no_color && matches!(args.format, FormatArg::Text) {
        config = config.with_color();
    }
    if args.group_by_severity {
        config = config.grouped_by_severity();
    }
    config
}

fn migration_config(args: &DiffArgs) -> MigrationConfig {
    let mut config = MigrationConfig::new();
    if args.no_transaction {
        config = config.without_transactions();
    }
    if args.safe_mode {
        config = config.safe();
    }
    config
}

fn warn_tag(args: &DiffArgs) -> String {
    if args.no_color {
        "Warning:".to_string()
    } else {
        "Warning:".yellow().bold().to_string()
    }
}
