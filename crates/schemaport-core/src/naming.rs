use std::sync::LazyLock;

use regex::Regex;

static UPPERCASE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.?([A-Z]+)").expect("valid uppercase pattern"));
static VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@v\d+(?:\.\d+)*").expect("valid version tag pattern"));
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

/// Postgres keywords that cannot be used as bare table or column names.
/// Sorted for binary search.
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant",
    "group", "having", "ilike", "in", "initially", "inner", "intersect", "into", "is",
    "isnull", "join", "lateral", "leading", "left", "like", "limit", "localtime",
    "localtimestamp", "natural", "not", "notnull", "null", "offset", "on", "only", "or",
    "order", "outer", "overlaps", "placing", "primary", "references", "returning", "right",
    "select", "session_user", "similar", "some", "symmetric", "system_user", "table",
    "tablesample", "then", "to", "trailing", "true", "union", "unique", "user", "using",
    "variadic", "verbose", "when", "where", "window", "with",
];

/// Normalize a property name into a column name.
///
/// An optional `.` followed by a run of capitals becomes `_` plus the
/// lowercased run, so `geoJSON` maps to `geo_json` and `a.B` to `a_b`.
pub fn to_snake_case(property: &str) -> String {
    let replaced = UPPERCASE_RUN.replace_all(property, "_$1").to_lowercase();
    match replaced.strip_prefix('_') {
        Some(rest) => rest.to_string(),
        None => replaced,
    }
}

/// Remove every `@v<major>.<minor>` version tag from a reference.
pub fn strip_version_tag(reference: &str) -> String {
    VERSION_TAG.replace_all(reference, "").into_owned()
}

/// Returns true for plain, unquoted SQL identifiers.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Returns true for keywords Postgres refuses as unquoted names.
pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS
        .binary_search(&name.to_ascii_lowercase().as_str())
        .is_ok()
}

/// Derive a `<dataset>.<class>` table name from a class URI.
///
/// Only the last two path segments count; an `.objects` suffix and any
/// version tag are dropped.
pub fn table_name_from_uri(uri: &str) -> String {
    let segments: Vec<&str> = uri.split('/').collect();
    let start = segments.len().saturating_sub(2);
    let joined = segments[start..].join(".").replace(".objects", "");
    strip_version_tag(&joined)
}
