//! Keyword table for the DDL lexer
//!
//! The lexer lowercases every unquoted identifier and binary searches this
//! table; everything not found stays an identifier. The set is closed: it
//! covers exactly the words the CREATE TABLE grammar gives meaning to.

/// Keywords recognized by the lexer, case-insensitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Action,
    All,
    Alter,
    Always,
    As,
    Asc,
    By,
    Cache,
    Cascade,
    Check,
    Collate,
    Comments,
    Commit,
    Compression,
    Constraint,
    Constraints,
    Create,
    Cycle,
    Default,
    Defaults,
    Deferrable,
    Deferred,
    Delete,
    Desc,
    Distinct,
    Drop,
    Enforced,
    Exclude,
    Excluding,
    Exists,
    Extended,
    External,
    First,
    For,
    Foreign,
    From,
    Full,
    Generated,
    Global,
    Hash,
    Identity,
    If,
    Immediate,
    Include,
    Including,
    Increment,
    Indexes,
    Inherit,
    Inherits,
    Initially,
    Key,
    Last,
    Like,
    List,
    Local,
    Main,
    Match,
    Maxvalue,
    Minvalue,
    No,
    Not,
    Null,
    Nulls,
    Of,
    Oids,
    On,
    Overlaps,
    Owned,
    Partial,
    Partition,
    Period,
    Plain,
    Preserve,
    Primary,
    Range,
    References,
    Restrict,
    Rows,
    Set,
    Simple,
    Start,
    Statistics,
    Storage,
    Stored,
    Table,
    Tablespace,
    Temp,
    Temporary,
    To,
    Unique,
    Unlogged,
    Update,
    Using,
    Values,
    Virtual,
    Where,
    With,
    Without,
}

/// Lookup table, sorted so `lookup_keyword` can binary search it
const KEYWORDS: &[(&str, Keyword)] = &[
    ("action", Keyword::Action),
    ("all", Keyword::All),
    ("alter", Keyword::Alter),
    ("always", Keyword::Always),
    ("as", Keyword::As),
    ("asc", Keyword::Asc),
    ("by", Keyword::By),
    ("cache", Keyword::Cache),
    ("cascade", Keyword::Cascade),
    ("check", Keyword::Check),
    ("collate", Keyword::Collate),
    ("comments", Keyword::Comments),
    ("commit", Keyword::Commit),
    ("compression", Keyword::Compression),
    ("constraint", Keyword::Constraint),
    ("constraints", Keyword::Constraints),
    ("create", Keyword::Create),
    ("cycle", Keyword::Cycle),
    ("default", Keyword::Default),
    ("defaults", Keyword::Defaults),
    ("deferrable", Keyword::Deferrable),
    ("deferred", Keyword::Deferred),
    ("delete", Keyword::Delete),
    ("desc", Keyword::Desc),
    ("distinct", Keyword::Distinct),
    ("drop", Keyword::Drop),
    ("enforced", Keyword::Enforced),
    ("exclude", Keyword::Exclude),
    ("excluding", Keyword::Excluding),
    ("exists", Keyword::Exists),
    ("extended", Keyword::Extended),
    ("external", Keyword::External),
    ("first", Keyword::First),
    ("for", Keyword::For),
    ("foreign", Keyword::Foreign),
    ("from", Keyword::From),
    ("full", Keyword::Full),
    ("generated", Keyword::Generated),
    ("global", Keyword::Global),
    ("hash", Keyword::Hash),
    ("identity", Keyword::Identity),
    ("if", Keyword::If),
    ("immediate", Keyword::Immediate),
    ("include", Keyword::Include),
    ("including", Keyword::Including),
    ("increment", Keyword::Increment),
    ("indexes", Keyword::Indexes),
    ("inherit", Keyword::Inherit),
    ("inherits", Keyword::Inherits),
    ("initially", Keyword::Initially),
    ("key", Keyword::Key),
    ("last", Keyword::Last),
    ("like", Keyword::Like),
    ("list", Keyword::List),
    ("local", Keyword::Local),
    ("main", Keyword::Main),
    ("match", Keyword::Match),
    ("maxvalue", Keyword::Maxvalue),
    ("minvalue", Keyword::Minvalue),
    ("no", Keyword::No),
    ("not", Keyword::Not),
    ("null", Keyword::Null),
    ("nulls", Keyword::Nulls),
    ("of", Keyword::Of),
    ("oids", Keyword::Oids),
    ("on", Keyword::On),
    ("overlaps", Keyword::Overlaps),
    ("owned", Keyword::Owned),
    ("partial", Keyword::Partial),
    ("partition", Keyword::Partition),
    ("period", Keyword::Period),
    ("plain", Keyword::Plain),
    ("preserve", Keyword::Preserve),
    ("primary", Keyword::Primary),
    ("range", Keyword::Range),
    ("references", Keyword::References),
    ("restrict", Keyword::Restrict),
    ("rows", Keyword::Rows),
    ("set", Keyword::Set),
    ("simple", Keyword::Simple),
    ("start", Keyword::Start),
    ("statistics", Keyword::Statistics),
    ("storage", Keyword::Storage),
    ("stored", Keyword::Stored),
    ("table", Keyword::Table),
    ("tablespace", Keyword::Tablespace),
    ("temp", Keyword::Temp),
    ("temporary", Keyword::Temporary),
    ("to", Keyword::To),
    ("unique", Keyword::Unique),
    ("unlogged", Keyword::Unlogged),
    ("update", Keyword::Update),
    ("using", Keyword::Using),
    ("values", Keyword::Values),
    ("virtual", Keyword::Virtual),
    ("where", Keyword::Where),
    ("with", Keyword::With),
    ("without", Keyword::Without),
];

/// Resolves a lowercased lexeme to a keyword, if it is one
pub fn lookup_keyword(lower: &str) -> Option<Keyword> {
    KEYWORDS
        .binary_search_by_key(&lower, |(word, _)| *word)
        .ok()
        .map(|idx| KEYWORDS[idx].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        for pair in KEYWORDS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup_keyword("create"), Some(Keyword::Create));
        assert_eq!(lookup_keyword("without"), Some(Keyword::Without));
        assert_eq!(lookup_keyword("varchar"), None);
        assert_eq!(lookup_keyword("timestamp"), None);
    }
}
