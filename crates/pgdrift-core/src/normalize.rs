//! Normalization rules for type names, default expressions, and identifiers
//!
//! DDL files and live introspection spell the same schema differently:
//! `int4` vs `integer`, `timestamp(3) with time zone` vs `timestamptz(3)`,
//! defaults with and without `::type` casts. The comparator goes through
//! these functions so that equivalent spellings never show up as diffs.

/// Type aliases mapped to their canonical spelling, sorted by alias
const TYPE_ALIASES: &[(&str, &str)] = &[
    ("bool", "boolean"),
    ("char", "character"),
    ("decimal", "numeric"),
    ("float4", "real"),
    ("float8", "double precision"),
    ("int", "integer"),
    ("int2", "smallint"),
    ("int4", "integer"),
    ("int8", "bigint"),
    ("timestamptz", "timestamptz"),
    ("varchar", "character varying"),
];

/// Canonicalizes a declared type name.
///
/// Lowercases, strips an all-alphabetic schema qualifier, folds the
/// `with/without time zone` spellings, and applies the alias table while
/// preserving any precision or array suffix. Idempotent.
pub fn canonical_type_name(raw: &str) -> String {
    let mut t = collapse_whitespace(&raw.trim().to_lowercase());

    // `public.review_status` -> `review_status`, but never `numeric(10,2)`
    // style dots inside precision, and never qualifiers with digits.
    if let Some(dot) = t.find('.') {
        let qualifier = &t[..dot];
        if !qualifier.is_empty() && qualifier.chars().all(|c| c.is_ascii_alphabetic()) {
            t = t[dot + 1..].to_string();
        }
    }

    if let Some(stripped) = t.strip_suffix(" without time zone") {
        t = stripped.to_string();
    }

    // `timestamp[(p)] with time zone` -> `timestamptz[(p)]`
    if let Some(rest) = t.strip_prefix("timestamp")
        && let Some(mid) = rest.strip_suffix(" with time zone")
        && (mid.is_empty() || (mid.starts_with('(') && mid.ends_with(')')))
    {
        t = format!("timestamptz{mid}");
    }

    let (base, suffix) = split_type_suffix(&t);
    match TYPE_ALIASES.binary_search_by_key(&base, |(alias, _)| *alias) {
        Ok(idx) => format!("{}{}", TYPE_ALIASES[idx].1, suffix),
        Err(_) => t,
    }
}

/// Compares two declared types for semantic equality
pub fn types_equal(a: &str, b: &str, normalize: bool) -> bool {
    if normalize {
        canonical_type_name(a) == canonical_type_name(b)
    } else {
        a.trim().eq_ignore_ascii_case(b.trim())
    }
}

/// Truncates an expression at its first `::type` cast suffix.
///
/// Introspected defaults usually carry casts the source DDL omits, e.g.
/// `'DRAFT'::review_status` for a plain `'DRAFT'`.
pub fn strip_cast_suffix(expr: &str) -> &str {
    match expr.find("::") {
        Some(idx) => expr[..idx].trim_end(),
        None => expr.trim_end(),
    }
}

/// Compares two captured expressions lexically, modulo cast suffixes and,
/// optionally, all whitespace
pub fn exprs_equal(a: &str, b: &str, ignore_whitespace: bool) -> bool {
    let a = strip_cast_suffix(a.trim());
    let b = strip_cast_suffix(b.trim());
    if ignore_whitespace {
        let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        squash(a) == squash(b)
    } else {
        a == b
    }
}

/// Compares two identifiers under the configured case rule
pub fn names_equal(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Folds an identifier into a comparison key
pub fn fold_name(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

/// True for the `default` collation sentinel some catalogs report
pub fn is_default_collation(name: &str) -> bool {
    name.eq_ignore_ascii_case("default")
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space && !out.is_empty() {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out.trim_end().to_string()
}

fn split_type_suffix(t: &str) -> (&str, &str) {
    match t.find(['(', '[']) {
        Some(idx) => (t[..idx].trim_end(), &t[idx..]),
        None => (t, ""),
    }
}
