//! Human-readable diff report rendering
//!
//! Renders a `SchemaDiff` as plain text or Markdown into an in-memory
//! string. Structure: a summary with table and severity counts, a
//! per-table details section, and a footer when nothing differs. Colors
//! are plain ANSI escapes applied only in text format; Markdown keeps
//! the severity icons but drops the colors.

use crate::compare::{DiffEntry, SchemaDiff, Severity, TableDiff};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
}

/// How much detail the report carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Summary section only
    Summary,
    /// Summary plus per-table detail lines
    #[default]
    Normal,
    /// Adds per-table difference counts
    Detailed,
    /// Adds the severity of every detail line
    Verbose,
}

/// How old/new values are rendered on detail lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffStyle {
    /// `(old -> new)` with both values
    #[default]
    Full,
    /// Only the new value (or the old one for removals)
    Compact,
}

/// Configuration for report rendering
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub verbosity: Verbosity,
    pub use_color: bool,
    pub show_icons: bool,
    pub diff_style: DiffStyle,
    /// Order detail lines most severe first
    pub group_by_severity: bool,
    /// Truncate lines to this many characters, 0 for no limit
    pub max_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            verbosity: Verbosity::Normal,
            use_color: false,
            show_icons: true,
            diff_style: DiffStyle::Full,
            group_by_severity: false,
            max_width: 0,
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markdown(mut self) -> Self {
        self.format = ReportFormat::Markdown;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_color(mut self) -> Self {
        self.use_color = true;
        self
    }

    pub fn without_icons(mut self) -> Self {
        self.show_icons = false;
        self
    }

    pub fn grouped_by_severity(mut self) -> Self {
        self.group_by_severity = true;
        self
    }

    pub fn with_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }
}

/// Renders schema diffs into report text
#[derive(Debug, Default)]
pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    /// Creates a renderer with the default configuration
    pub fn new() -> Self {
        Self {
            config: ReportConfig::default(),
        }
    }

    /// Creates a renderer with the given configuration
    pub fn with_config(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Renders the full report
    pub fn generate(&self, diff: &SchemaDiff) -> String {
        let mut out = String::new();

        self.render_title(&mut out, "Schema comparison report");
        self.render_summary(&mut out, diff);

        if diff.is_empty() {
            out.push('\n');
            self.push_line(&mut out, "No differences found");
            return out;
        }

        if self.config.verbosity > Verbosity::Summary {
            for td in &diff.table_diffs {
                self.render_table(&mut out, td);
            }
        }

        out
    }

    fn render_title(&self, out: &mut String, title: &str) {
        match self.config.format {
            ReportFormat::Text => {
                let title = if self.config.use_color {
                    format!("{ANSI_BOLD}{title}{ANSI_RESET}")
                } else {
                    title.to_string()
                };
                self.push_line(out, &title);
                self.push_line(out, &"=".repeat(title_width(title.as_str())));
            }
            ReportFormat::Markdown => {
                self.push_line(out, &format!("# {title}"));
            }
        }
        out.push('\n');
    }

    fn render_summary(&self, out: &mut String, diff: &SchemaDiff) {
        let counts = diff.counts();
        let bullet = match self.config.format {
            ReportFormat::Text => "",
            ReportFormat::Markdown => "- ",
        };

        self.push_line(out, &format!("{bullet}Tables added:    {}", counts.tables_added));
        self.push_line(out, &format!("{bullet}Tables removed:  {}", counts.tables_removed));
        self.push_line(out, &format!("{bullet}Tables modified: {}", counts.tables_modified));
        out.push('\n');

        for (severity, count, word) in [
            (Severity::Critical, counts.critical, "critical"),
            (Severity::Warning, counts.warning, "warning"),
            (Severity::Info, counts.info, "info"),
        ] {
            let icon = self.icon(severity);
            self.push_line(
                out,
                &format!("{bullet}{icon}{}: {count}", self.paint(word, severity)),
            );
        }
    }

    fn render_table(&self, out: &mut String, td: &TableDiff) {
        out.push('\n');
        match self.config.format {
            ReportFormat::Text => self.push_line(out, &format!("Table {}", td.table)),
            ReportFormat::Markdown => self.push_line(out, &format!("## {}", td.table)),
        }

        if self.config.verbosity >= Verbosity::Detailed && !td.added && !td.removed {
            self.push_line(
                out,
                &format!(
                    "  {} difference{}",
                    td.entries.len(),
                    if td.entries.len() == 1 { "" } else { "s" }
                ),
            );
        }

        // Added and removed tables get a single line, not per-element
        // detail.
        if td.added || td.removed {
            if let Some(entry) = td.entries.first() {
                self.push_line(out, &self.entry_line(entry));
            }
            return;
        }

        if self.config.group_by_severity {
            let mut sorted: Vec<&DiffEntry> = td.entries.iter().collect();
            sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
            for entry in sorted {
                self.push_line(out, &self.entry_line(entry));
            }
        } else {
            for entry in &td.entries {
                self.push_line(out, &self.entry_line(entry));
            }
        }
    }

    fn entry_line(&self, entry: &DiffEntry) -> String {
        let prefix = match self.config.format {
            ReportFormat::Text => "  ",
            ReportFormat::Markdown => "- ",
        };
        let icon = self.icon(entry.severity);
        let label = self.paint(entry.kind.label(), entry.severity);

        let mut line = format!("{prefix}{icon}{label}");
        if let Some(element) = &entry.element {
            line.push_str(&format!(": {element}"));
        }

        let values = match self.config.diff_style {
            DiffStyle::Full => match (&entry.old, &entry.new) {
                (Some(old), Some(new)) => Some(format!("{old} -> {new}")),
                (Some(old), None) => Some(old.clone()),
                (None, Some(new)) => Some(new.clone()),
                (None, None) => None,
            },
            DiffStyle::Compact => entry.new.clone().or_else(|| entry.old.clone()),
        };
        if let Some(values) = values {
            line.push_str(&format!(" ({values})"));
        }

        if self.config.verbosity >= Verbosity::Verbose {
            let word = match entry.severity {
                Severity::Critical => "critical",
                Severity::Warning => "warning",
                Severity::Info => "info",
            };
            line.push_str(&format!(" [{word}]"));
        }

        line
    }

    fn icon(&self, severity: Severity) -> String {
        if !self.config.show_icons {
            return String::new();
        }
        format!("{} ", self.paint(severity.icon(), severity))
    }

    fn paint(&self, text: &str, severity: Severity) -> String {
        if !self.config.use_color || self.config.format == ReportFormat::Markdown {
            return text.to_string();
        }
        let color = match severity {
            Severity::Critical => ANSI_RED,
            Severity::Warning => ANSI_YELLOW,
            Severity::Info => ANSI_GREEN,
        };
        format!("{color}{text}{ANSI_RESET}")
    }

    fn push_line(&self, out: &mut String, line: &str) {
        if self.config.max_width > 0 {
            let count = line.chars().count();
            if count > self.config.max_width {
                let truncated: String =
                    line.chars().take(self.config.max_width.saturating_sub(3)).collect();
                out.push_str(&truncated);
                out.push_str("...");
                out.push('\n');
                return;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
}

/// Width of the underline below the title, ignoring escape sequences
fn title_width(title: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in title.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }
    width
}
