//! Column default extraction.
//!
//! SQL Server reports defaults wrapped in parentheses: `(N'text')`,
//! `((42))`, `(getdate())`. Literals are turned into typed values,
//! everything else is kept as a generator expression.

use std::sync::LazyLock;

use regex::Regex;
use sqlbridge_core::schema::ColumnDefault;
use sqlbridge_core::types::TypeDescriptor;

fn re(source: &str) -> Regex {
    Regex::new(source).expect("default patterns are valid")
}

static QUOTED_DEFAULT: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)^\(N?'(.*)'\)$"));
static PARENTHESIZED_DEFAULT: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)^\(\(?(.*?)\)?\)$"));
static NUMERIC_DEFAULT: LazyLock<Regex> = LazyLock::new(|| re(r"^\(?\(?(-?\d+(?:\.\d+)?)\)?\)?$"));

/// Extracts the default text the way the catalog stores it.
///
/// `(N'it''s')` gives `it's`, `((1))` gives `1`. Anything else is
/// returned as reported. `None` for missing or NULL defaults.
#[must_use]
pub fn extract_default(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_null_default(trimmed) {
        return None;
    }
    if let Some(caps) = QUOTED_DEFAULT.captures(trimmed) {
        return Some(caps[1].replace("''", "'"));
    }
    if let Some(caps) = PARENTHESIZED_DEFAULT.captures(trimmed) {
        return Some(caps[1].to_string());
    }
    Some(trimmed.to_string())
}

/// Splits a stored default into a typed literal or a generator expression.
#[must_use]
pub fn parse_default(raw: &str, descriptor: &TypeDescriptor) -> Option<ColumnDefault> {
    let trimmed = raw.trim();
    if is_null_default(trimmed) {
        return None;
    }
    if let Some(caps) = QUOTED_DEFAULT.captures(trimmed) {
        let text = caps[1].replace("''", "'");
        return Some(descriptor.cast(&text).map_or_else(
            || ColumnDefault::Function(unwrap_parens(trimmed).to_string()),
            ColumnDefault::Value,
        ));
    }
    if let Some(caps) = NUMERIC_DEFAULT.captures(trimmed) {
        if let Some(value) = descriptor.cast(&caps[1]) {
            return Some(ColumnDefault::Value(value));
        }
    }
    Some(ColumnDefault::Function(unwrap_parens(trimmed).to_string()))
}

fn is_null_default(trimmed: &str) -> bool {
    let inner = unwrap_parens(trimmed);
    inner.is_empty() || inner.eq_ignore_ascii_case("null")
}

/// Removes parentheses that enclose the whole expression.
fn unwrap_parens(mut expr: &str) -> &str {
    while let Some(inner) = expr.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        if !is_balanced(inner) {
            break;
        }
        expr = inner.trim();
    }
    expr
}

fn is_balanced(expr: &str) -> bool {
    let mut depth = 0usize;
    for c in expr.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
