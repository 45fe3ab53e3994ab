//! SQL Dialect support.
//!
//! Different databases have slightly different SQL syntax. A [`Dialect`]
//! bundles a [`DialectCapabilities`] table that steers the compiler with
//! the quoting, type mapping and error translation of one engine.

mod db2;
mod generic;
mod postgres;
mod sqlite;

pub use db2::Db2Dialect;
pub use generic::GenericDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::connection::DriverError;
use crate::error::{AdapterError, Result};
use crate::quoting::{self, DefaultTimezone};
use crate::schema::ColumnDefault;
use crate::translate::ErrorTranslator;
use crate::types::{render_native, NativeTypes, TypeDescriptor, TypeMap, TypeOptions};
use crate::value::SqlValue;

/// How LIMIT and OFFSET are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// `LIMIT n OFFSET m`.
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`.
    OffsetFetch,
    /// `FETCH FIRST n ROWS ONLY`, with a `row_number()` window for offsets.
    FetchFirst,
}

/// Where row locks go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStyle {
    /// A trailing clause such as `FOR UPDATE`.
    Trailing,
    /// An inline hint after every table reference; `FOR UPDATE` becomes
    /// `WITH(UPDLOCK)`.
    TableHint,
    /// Locks are dropped.
    Unsupported,
}

/// How inserted values are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningStyle {
    /// Not supported; callers fetch identities separately.
    Unsupported,
    /// Trailing `RETURNING col, ...`.
    Returning,
    /// `OUTPUT INSERTED.col, ...` between column list and values.
    Output,
    /// `SELECT col, ... FROM FINAL TABLE (INSERT ...)`.
    FinalTable,
}

/// How booleans are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanLiteral {
    /// `TRUE` / `FALSE`.
    Keyword,
    /// `1` / `0`.
    Numeric,
}

/// How binary values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryLiteral {
    /// `X'0A0B'`.
    HexString,
    /// `0x0A0B`.
    HexNumber,
    /// `'\x0a0b'`.
    EscapedBytea,
    /// `BLOB(X'0A0B')`.
    BlobFunction,
}

/// Capability table that parameterizes the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectCapabilities {
    /// Paging syntax.
    pub paging: PagingStyle,
    /// Paged selects without ORDER BY get one on the primary key.
    pub deterministic_paging: bool,
    /// OFFSET without LIMIT needs a LIMIT placeholder (`LIMIT -1`).
    pub offset_requires_limit: bool,
    /// Lock placement.
    pub lock: LockStyle,
    /// Derived tables may keep ORDER BY without LIMIT/OFFSET.
    pub ordered_subqueries: bool,
    /// Returning style for INSERT.
    pub returning: ReturningStyle,
    /// NULLS FIRST / NULLS LAST are understood.
    pub nulls_ordering: bool,
    /// Boolean literals.
    pub boolean: BooleanLiteral,
    /// Binary literals.
    pub binary: BinaryLiteral,
    /// String literals get an `N` prefix.
    pub unicode_strings: bool,
    /// Fractional second digits in temporal literals.
    pub fractional_digits: u8,
    /// Largest row limit, used where a limit must be synthesized.
    pub max_row_limit: i64,
    /// `SELECT DISTINCT 1 AS one` existence checks become `TOP(?) 1 AS [one]`.
    pub top_exists_check: bool,
    /// `SELECT DISTINCT` projects its ORDER BY expressions as `alias_N` columns.
    pub distinct_order_projections: bool,
    /// ORDER BY on UPDATE/DELETE requires a row limit.
    pub update_order_requires_limit: bool,
}

impl DialectCapabilities {
    /// ANSI defaults.
    pub const ANSI: Self = Self {
        paging: PagingStyle::LimitOffset,
        deterministic_paging: false,
        offset_requires_limit: false,
        lock: LockStyle::Trailing,
        ordered_subqueries: true,
        returning: ReturningStyle::Unsupported,
        nulls_ordering: true,
        boolean: BooleanLiteral::Keyword,
        binary: BinaryLiteral::HexString,
        unicode_strings: false,
        fractional_digits: 6,
        max_row_limit: i64::MAX,
        top_exists_check: false,
        distinct_order_projections: false,
        update_order_requires_limit: false,
    };
}

impl Default for DialectCapabilities {
    fn default() -> Self {
        Self::ANSI
    }
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the capability table.
    fn capabilities(&self) -> &DialectCapabilities;

    /// Returns the opening identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the closing identifier quote character.
    fn identifier_quote_close(&self) -> char {
        self.identifier_quote()
    }

    /// Returns the parameter placeholder style.
    fn parameter_placeholder(&self) -> &'static str {
        "?"
    }

    /// Returns the string concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Collation appended to operands of case-sensitive comparisons.
    fn case_sensitive_collation(&self) -> Option<&str> {
        None
    }

    /// Timezone that zone-aware values are converted to.
    fn default_timezone(&self) -> DefaultTimezone {
        DefaultTimezone::Utc
    }

    /// Quotes a single identifier, escaping the closing quote by doubling it.
    fn quote_identifier(&self, name: &str) -> String {
        let open = self.identifier_quote();
        let close = self.identifier_quote_close();
        let escaped = name.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Quotes a column name.
    fn quote_column_name(&self, name: &str) -> String {
        if name == "*" {
            return String::from("*");
        }
        self.quote_identifier(name)
    }

    /// Quotes a possibly schema-qualified table name.
    fn quote_table_name(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Renders a string literal.
    fn quote_string(&self, value: &str) -> String {
        let quoted = quoting::quote_string(value);
        if self.capabilities().unicode_strings {
            format!("N{quoted}")
        } else {
            quoted
        }
    }

    /// Renders a value as an inline SQL literal.
    fn quote(&self, value: &SqlValue) -> String {
        let caps = self.capabilities();
        match value {
            SqlValue::Null => String::from("NULL"),
            SqlValue::Bool(b) => match (caps.boolean, *b) {
                (BooleanLiteral::Keyword, true) => String::from("TRUE"),
                (BooleanLiteral::Keyword, false) => String::from("FALSE"),
                (BooleanLiteral::Numeric, true) => String::from("1"),
                (BooleanLiteral::Numeric, false) => String::from("0"),
            },
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) if f.is_finite() => f.to_string(),
            SqlValue::Float(f) => quoting::quote_string(&f.to_string()),
            SqlValue::Decimal(d) if quoting::is_decimal_literal(d) => d.clone(),
            SqlValue::Decimal(d) => quoting::quote_string(d),
            SqlValue::Text(s) => self.quote_string(s),
            SqlValue::Blob(bytes) => {
                let hex = quoting::hex_upper(bytes);
                match caps.binary {
                    BinaryLiteral::HexString => format!("X'{hex}'"),
                    BinaryLiteral::HexNumber => format!("0x{hex}"),
                    BinaryLiteral::EscapedBytea => format!("'\\x{}'", hex.to_ascii_lowercase()),
                    BinaryLiteral::BlobFunction => format!("BLOB(X'{hex}')"),
                }
            }
            SqlValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            SqlValue::Time(t) => format!("'{}'", quoting::format_time(t, caps.fractional_digits)),
            SqlValue::DateTime(dt) => {
                format!("'{}'", quoting::format_datetime(dt, caps.fractional_digits))
            }
            SqlValue::DateTimeTz(dt) => {
                let local = self.default_timezone().convert(dt);
                format!("'{}'", quoting::format_datetime(&local, caps.fractional_digits))
            }
        }
    }

    /// Renders a column default for DDL.
    fn quote_default_expression(
        &self,
        default: &ColumnDefault,
        _descriptor: Option<&TypeDescriptor>,
    ) -> String {
        match default {
            ColumnDefault::Value(value) => self.quote(value),
            ColumnDefault::Function(expr) => expr.clone(),
        }
    }

    /// Splits a stored default into a literal value or a generator expression.
    ///
    /// Returns `None` for absent or NULL defaults.
    fn parse_default(&self, raw: &str, descriptor: &TypeDescriptor) -> Option<ColumnDefault> {
        parse_quoted_default(raw, descriptor)
    }

    /// Logical to native type table.
    fn native_types(&self) -> NativeTypes;

    /// Native type map.
    fn type_map(&self) -> &TypeMap;

    /// Resolves a native type string.
    fn lookup_type(&self, sql_type: &str) -> Option<TypeDescriptor> {
        self.type_map().lookup(sql_type)
    }

    /// Renders the native type for a logical type. Unknown logical names
    /// are passed through.
    fn type_to_sql(&self, logical: &str, options: TypeOptions) -> Result<String> {
        Ok(self
            .native_types()
            .get(logical)
            .map_or_else(|| logical.to_string(), |native| render_native(native, options)))
    }

    /// Error translation rules.
    fn error_translator(&self) -> &ErrorTranslator;

    /// Translates a driver error raised while running `sql` with `binds`.
    fn translate_error(&self, error: DriverError, sql: Option<&str>, binds: &[SqlValue]) -> AdapterError {
        self.error_translator().translate(error, sql, binds)
    }
}

/// Shared default parsing for engines that store defaults as plain
/// literals: `'text'`, numbers, `NULL`; anything else is a generator.
#[must_use]
pub fn parse_quoted_default(raw: &str, descriptor: &TypeDescriptor) -> Option<ColumnDefault> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        let text = quoting::unquote_string(trimmed);
        return descriptor.cast(&text).map(ColumnDefault::Value);
    }
    if trimmed.parse::<f64>().is_ok() {
        if let Some(value) = descriptor.cast(trimmed) {
            return Some(ColumnDefault::Value(value));
        }
    }
    Some(ColumnDefault::Function(trimmed.to_string()))
}
