//! SQLite dialect.

use std::sync::LazyLock;

use regex::Regex;

use super::{BooleanLiteral, Dialect, DialectCapabilities, LockStyle, ReturningStyle};
use crate::translate::ErrorTranslator;
use crate::types::{NativeType, NativeTypes, TypeDescriptor, TypeKind, TypeMap};

static CAPABILITIES: DialectCapabilities = DialectCapabilities {
    offset_requires_limit: true,
    lock: LockStyle::Unsupported,
    returning: ReturningStyle::Returning,
    boolean: BooleanLiteral::Numeric,
    ..DialectCapabilities::ANSI
};

static NATIVE_TYPES: &[(&str, NativeType)] = &[
    (
        "primary_key",
        NativeType::new("integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
    ),
    ("string", NativeType::new("varchar")),
    ("text", NativeType::new("text")),
    ("integer", NativeType::new("integer")),
    ("bigint", NativeType::new("bigint")),
    ("float", NativeType::new("float")),
    ("decimal", NativeType::new("decimal")),
    ("datetime", NativeType::new("datetime")),
    ("time", NativeType::new("time")),
    ("date", NativeType::new("date")),
    ("binary", NativeType::new("blob")),
    ("boolean", NativeType::new("boolean")),
];

fn re(source: &str) -> Regex {
    Regex::new(source).expect("type patterns are valid")
}

static TYPE_MAP: LazyLock<TypeMap> = LazyLock::new(|| {
    TypeMap::new()
        .register("integer", |t| TypeDescriptor::new(TypeKind::Integer, t))
        .register("bigint", |t| TypeDescriptor::new(TypeKind::BigInteger, t))
        .register("boolean", |t| TypeDescriptor::new(TypeKind::Boolean, t))
        .register("date", |t| TypeDescriptor::new(TypeKind::Date, t))
        .register("datetime", |t| TypeDescriptor::new(TypeKind::DateTime, t))
        .register("time", |t| TypeDescriptor::new(TypeKind::Time, t))
        .register("blob", |t| TypeDescriptor::new(TypeKind::Binary, t))
        .register("text", |t| TypeDescriptor::new(TypeKind::Text, t))
        .register_pattern(re(r"^(decimal|numeric)"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::Decimal, t)
        })
        .register_pattern(re(r"^(real|double|float)"), |t| TypeDescriptor::new(TypeKind::Float, t))
        .register_pattern(re(r"^(varchar|character|char|nvarchar|nchar)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        .register_pattern(re(r"int"), |t| TypeDescriptor::new(TypeKind::Integer, t))
        .alias("bool", "boolean")
        .alias("timestamp", "datetime")
});

static TRANSLATOR: LazyLock<ErrorTranslator> = LazyLock::new(ErrorTranslator::sqlite);

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn capabilities(&self) -> &DialectCapabilities {
        &CAPABILITIES
    }

    fn case_sensitive_collation(&self) -> Option<&str> {
        Some("COLLATE BINARY")
    }

    fn native_types(&self) -> NativeTypes {
        NativeTypes::new(NATIVE_TYPES)
    }

    fn type_map(&self) -> &TypeMap {
        &TYPE_MAP
    }

    fn error_translator(&self) -> &ErrorTranslator {
        &TRANSLATOR
    }
}
