//! Microsoft SQL Server dialect.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;
use sqlbridge_core::dialect::{
    BinaryLiteral, BooleanLiteral, Dialect, DialectCapabilities, LockStyle, PagingStyle, ReturningStyle,
};
use sqlbridge_core::error::Result;
use sqlbridge_core::quoting::DefaultTimezone;
use sqlbridge_core::schema::ColumnDefault;
use sqlbridge_core::translate::ErrorTranslator;
use sqlbridge_core::types::{NativeTypes, TypeDescriptor, TypeKind, TypeMap, TypeOptions};
use sqlbridge_core::value::SqlValue;

use crate::{column, errors, types};

/// Collation used for case-sensitive comparisons unless overridden.
pub const DEFAULT_CASE_SENSITIVE_COLLATION: &str = "COLLATE Latin1_General_CS_AS_WS";

/// Quoted names kept per dialect before the cache is reset.
const QUOTE_CACHE_LIMIT: usize = 4096;

static CAPABILITIES: DialectCapabilities = DialectCapabilities {
    paging: PagingStyle::OffsetFetch,
    deterministic_paging: true,
    offset_requires_limit: false,
    lock: LockStyle::TableHint,
    ordered_subqueries: false,
    returning: ReturningStyle::Output,
    nulls_ordering: false,
    boolean: BooleanLiteral::Numeric,
    binary: BinaryLiteral::HexNumber,
    unicode_strings: true,
    fractional_digits: 6,
    max_row_limit: i64::MAX,
    top_exists_check: true,
    distinct_order_projections: true,
    update_order_requires_limit: true,
};

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*\]$").expect("quoting patterns are valid"));

/// Microsoft SQL Server dialect.
///
/// Identifiers are bracketed (`[dbo].[users]`), strings are unicode
/// literals (`N'...'`), booleans are `bit` values and paging uses
/// `OFFSET .. ROWS FETCH NEXT .. ROWS ONLY`.
#[derive(Debug)]
pub struct SqlServerDialect {
    timezone: DefaultTimezone,
    collation: String,
    quoted_names: RwLock<HashMap<String, String>>,
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SqlServerDialect {
    fn clone(&self) -> Self {
        Self {
            timezone: self.timezone,
            collation: self.collation.clone(),
            quoted_names: RwLock::new(HashMap::new()),
        }
    }
}

impl SqlServerDialect {
    /// Creates a dialect converting to UTC with the default collation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timezone: DefaultTimezone::Utc,
            collation: String::from(DEFAULT_CASE_SENSITIVE_COLLATION),
            quoted_names: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the timezone zone-aware values are converted to.
    #[must_use]
    pub const fn with_timezone(mut self, timezone: DefaultTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Sets the collation clause used for case-sensitive comparisons.
    #[must_use]
    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = collation.into();
        self
    }

    /// Brackets every `.`-separated part of `name`, memoising the result.
    fn quote_name(&self, name: &str) -> String {
        let cached = self
            .quoted_names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(quoted) = cached {
            return quoted;
        }
        let quoted = name
            .split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".");
        {
            let mut cache = self.quoted_names.write().unwrap_or_else(PoisonError::into_inner);
            if cache.len() >= QUOTE_CACHE_LIMIT {
                cache.clear();
            }
            cache.insert(name.to_string(), quoted.clone());
        }
        quoted
    }
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn capabilities(&self) -> &DialectCapabilities {
        &CAPABILITIES
    }

    fn identifier_quote(&self) -> char {
        '['
    }

    fn identifier_quote_close(&self) -> char {
        ']'
    }

    fn concat_operator(&self) -> &'static str {
        "+"
    }

    fn case_sensitive_collation(&self) -> Option<&str> {
        Some(&self.collation)
    }

    fn default_timezone(&self) -> DefaultTimezone {
        self.timezone
    }

    /// Brackets a single name part. Parts that are already bracketed are
    /// kept; `]` inside a name is escaped as `]]`.
    fn quote_identifier(&self, name: &str) -> String {
        if BRACKETED.is_match(name) {
            return name.to_string();
        }
        format!("[{}]", name.replace(']', "]]"))
    }

    fn quote_column_name(&self, name: &str) -> String {
        if name == "*" {
            return String::from("*");
        }
        self.quote_name(name)
    }

    fn quote_table_name(&self, name: &str) -> String {
        self.quote_name(name)
    }

    /// Passes through uuid defaults that are generator calls such as
    /// `newid()` even when they were stored as text.
    fn quote_default_expression(&self, default: &ColumnDefault, descriptor: Option<&TypeDescriptor>) -> String {
        match default {
            ColumnDefault::Value(SqlValue::Text(text))
                if descriptor.is_some_and(|d| d.kind == TypeKind::Uuid) && text.contains("()") =>
            {
                text.clone()
            }
            ColumnDefault::Value(value) => self.quote(value),
            ColumnDefault::Function(expr) => expr.clone(),
        }
    }

    fn parse_default(&self, raw: &str, descriptor: &TypeDescriptor) -> Option<ColumnDefault> {
        column::parse_default(raw, descriptor)
    }

    fn native_types(&self) -> NativeTypes {
        types::native_types()
    }

    fn type_map(&self) -> &TypeMap {
        &types::TYPE_MAP
    }

    fn type_to_sql(&self, logical: &str, options: TypeOptions) -> Result<String> {
        types::type_to_sql(logical, options)
    }

    fn error_translator(&self) -> &ErrorTranslator {
        &errors::TRANSLATOR
    }
}
