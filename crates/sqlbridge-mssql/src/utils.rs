//! Name helpers for raw SQL Server statements.

use std::sync::LazyLock;

use regex::Regex;

fn re(source: &str) -> Regex {
    Regex::new(source).expect("statement patterns are valid")
}

static TABLE_NAME_INSERT_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^\s*(?:INSERT|EXEC sp_executesql N'INSERT)(?:\s+INTO)?\s+([^\(\s]+)\s*|^\s*update\s+([^\(\s]+)\s*")
});
static TABLE_NAME_FROM: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bFROM\s+([^\(\)\s,]+)\s*"));
static INSERT_SQL: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^\s*(?:INSERT|EXEC sp_executesql N'INSERT)\s"));

/// Target table of an INSERT or UPDATE, else the first table after FROM.
///
/// With `qualified` the name is returned as written, otherwise only its
/// last part without delimiters.
#[must_use]
pub fn get_table_name(sql: &str, qualified: bool) -> Option<String> {
    let name = TABLE_NAME_INSERT_UPDATE
        .captures(sql)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .or_else(|| TABLE_NAME_FROM.captures(sql).and_then(|caps| caps.get(1)))?
        .as_str();
    Some(if qualified {
        name.to_string()
    } else {
        unqualify_table_name(name)
    })
}

/// Whether `sql` is an INSERT, possibly wrapped in `sp_executesql`.
#[must_use]
pub fn is_insert_sql(sql: &str) -> bool {
    INSERT_SQL.is_match(sql)
}

/// `[db].[dbo].[users]` gives `users`.
#[must_use]
pub fn unqualify_table_name(name: &str) -> String {
    remove_identifier_delimiters(name.rsplit('.').next().unwrap_or(name))
}

/// `[db].[dbo].[users]` gives `dbo`.
#[must_use]
pub fn unqualify_table_schema(name: &str) -> Option<String> {
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        [.., schema, _] => Some(remove_identifier_delimiters(schema)),
        _ => None,
    }
}

/// `[db].[dbo].[users]` gives `db`.
#[must_use]
pub fn unqualify_db_name(name: &str) -> Option<String> {
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        [db, _, _, ..] => Some(remove_identifier_delimiters(db)),
        _ => None,
    }
}

/// Strips `[`, `]` and `"` from a name.
#[must_use]
pub fn remove_identifier_delimiters(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, '[' | ']' | '"')).collect()
}

/// Strips one level of bracket or double-quote delimiters, undoing escapes.
#[must_use]
pub fn unquote_identifier(name: &str) -> String {
    let name = name.trim();
    if let Some(inner) = name.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        return inner.replace("]]", "]");
    }
    if let Some(inner) = name.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        return inner.replace("\"\"", "\"");
    }
    name.to_string()
}
