//! Literal rendering helpers shared by the dialects.
//!
//! Strings are always escaped by doubling the quote character. Temporal
//! values are formatted with a dialect-chosen number of fractional digits,
//! and only when the fractional part is non-zero.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use serde::Deserialize;

static DECIMAL_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("literal patterns are valid"));

/// Timezone that zone-aware timestamps are converted to before quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultTimezone {
    /// Convert to UTC.
    #[default]
    Utc,
    /// Convert to the process-local timezone.
    Local,
}

impl DefaultTimezone {
    /// Converts a zone-aware timestamp into a naive one in this timezone.
    #[must_use]
    pub fn convert(self, value: &DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            Self::Utc => value.naive_utc(),
            Self::Local => value.with_timezone(&Local).naive_local(),
        }
    }
}

/// Whether `text` is a plain decimal number that can be written unquoted.
///
/// Exponents, signs other than a leading `-`, `inf` and `NaN` are rejected.
#[must_use]
pub fn is_decimal_literal(text: &str) -> bool {
    DECIMAL_LITERAL.is_match(text)
}

/// Splits `sql` at each `?` placeholder that is not inside a string literal
/// (`'...'`), a quoted identifier (`"..."`) or a bracketed name (`[...]`).
///
/// A statement with `n` placeholders yields `n + 1` segments.
#[must_use]
pub fn split_placeholders(sql: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    for (index, c) in sql.char_indices() {
        match (quote, c) {
            (Some(close), _) if c == close => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => quote = Some(']'),
            (None, '?') => {
                segments.push(&sql[start..index]);
                start = index + c.len_utf8();
            }
            (None, _) => {}
        }
    }
    segments.push(&sql[start..]);
    segments
}

/// Escapes `value` by doubling single quotes and wraps it in quotes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Strips one level of quoting from `value`, undoing doubled quotes.
///
/// Values without surrounding quotes are returned unchanged.
#[must_use]
pub fn unquote_string(value: &str) -> String {
    let inner = value
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(value);
    inner.replace("''", "'")
}

/// Uppercase hex encoding of `bytes`.
#[must_use]
pub fn hex_upper(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02X}");
        out
    })
}

/// Renders the fractional seconds of `nanos` with `digits` digits, prefixed
/// with a dot, or an empty string when the value has no fractional part.
#[must_use]
pub fn fraction(nanos: u32, digits: u8) -> String {
    let digits = digits.min(9);
    if nanos == 0 || digits == 0 {
        return String::new();
    }
    let scaled = nanos / 10u32.pow(u32::from(9 - digits));
    if scaled == 0 {
        return String::new();
    }
    format!(".{scaled:0width$}", width = usize::from(digits))
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS[.fraction]`.
#[must_use]
pub fn format_datetime(value: &NaiveDateTime, digits: u8) -> String {
    format!(
        "{}{}",
        value.format("%Y-%m-%d %H:%M:%S"),
        fraction(value.nanosecond() % 1_000_000_000, digits)
    )
}

/// Formats a time of day as `HH:MM:SS[.fraction]`.
#[must_use]
pub fn format_time(value: &NaiveTime, digits: u8) -> String {
    format!(
        "{}{}",
        value.format("%H:%M:%S"),
        fraction(value.nanosecond() % 1_000_000_000, digits)
    )
}
