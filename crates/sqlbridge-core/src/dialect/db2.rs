//! IBM DB2 dialect.
//!
//! DB2 pages with `FETCH FIRST n ROWS ONLY` and needs a `row_number()`
//! window once an offset is involved. Booleans are stored as `smallint`.

use std::sync::LazyLock;

use regex::Regex;

use super::{BinaryLiteral, BooleanLiteral, Dialect, DialectCapabilities, PagingStyle, ReturningStyle};
use crate::translate::ErrorTranslator;
use crate::types::{NativeType, NativeTypes, TypeDescriptor, TypeKind, TypeMap};

static CAPABILITIES: DialectCapabilities = DialectCapabilities {
    paging: PagingStyle::FetchFirst,
    returning: ReturningStyle::FinalTable,
    nulls_ordering: false,
    boolean: BooleanLiteral::Numeric,
    binary: BinaryLiteral::BlobFunction,
    ..DialectCapabilities::ANSI
};

static NATIVE_TYPES: &[(&str, NativeType)] = &[
    (
        "primary_key",
        NativeType::new("int not null generated by default as identity (start with 1) primary key"),
    ),
    ("string", NativeType::with_limit("varchar", 255)),
    ("text", NativeType::new("clob")),
    ("integer", NativeType::new("int")),
    ("bigint", NativeType::new("bigint")),
    ("float", NativeType::new("float")),
    ("decimal", NativeType::new("decimal")),
    ("datetime", NativeType::new("timestamp")),
    ("timestamp", NativeType::new("timestamp")),
    ("time", NativeType::new("time")),
    ("date", NativeType::new("date")),
    ("binary", NativeType::new("blob")),
    ("boolean", NativeType::new("smallint")),
    ("xml", NativeType::new("xml")),
];

fn re(source: &str) -> Regex {
    Regex::new(source).expect("type patterns are valid")
}

static TYPE_MAP: LazyLock<TypeMap> = LazyLock::new(|| {
    TypeMap::new()
        .register("smallint", |t| TypeDescriptor::new(TypeKind::Boolean, t))
        .register("integer", |t| TypeDescriptor::new(TypeKind::Integer, t))
        .register("bigint", |t| TypeDescriptor::new(TypeKind::BigInteger, t))
        .register("double", |t| TypeDescriptor::new(TypeKind::Float, t))
        .register("real", |t| TypeDescriptor::new(TypeKind::Float, t))
        .register("date", |t| TypeDescriptor::new(TypeKind::Date, t))
        .register("time", |t| TypeDescriptor::new(TypeKind::Time, t))
        .register("xml", |t| TypeDescriptor::new(TypeKind::Xml, t))
        .register_pattern(re(r"^timestamp"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::DateTime, t)
        })
        .register_pattern(re(r"^(decimal|numeric)"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::Decimal, t)
        })
        .register_pattern(re(r"^(varchar|char|graphic|vargraphic)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        .register_pattern(re(r"^(clob|dbclob)"), |t| TypeDescriptor::new(TypeKind::Text, t))
        .register_pattern(re(r"^blob"), |t| TypeDescriptor::new(TypeKind::Binary, t))
        .alias("int", "integer")
        .alias("float", "double")
});

static TRANSLATOR: LazyLock<ErrorTranslator> = LazyLock::new(ErrorTranslator::db2);

/// IBM DB2 dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct Db2Dialect;

impl Db2Dialect {
    /// Creates a new DB2 dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for Db2Dialect {
    fn name(&self) -> &'static str {
        "db2"
    }

    fn capabilities(&self) -> &DialectCapabilities {
        &CAPABILITIES
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
