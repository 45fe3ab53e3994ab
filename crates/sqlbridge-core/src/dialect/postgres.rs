//! PostgreSQL dialect.

use std::sync::LazyLock;

use regex::Regex;

use super::{BinaryLiteral, Dialect, DialectCapabilities, ReturningStyle};
use crate::error::Result;
use crate::schema::ColumnDefault;
use crate::translate::ErrorTranslator;
use crate::types::{render_native, NativeType, NativeTypes, TypeDescriptor, TypeKind, TypeMap, TypeOptions};
use crate::value::SqlValue;

static CAPABILITIES: DialectCapabilities = DialectCapabilities {
    returning: ReturningStyle::Returning,
    binary: BinaryLiteral::EscapedBytea,
    ..DialectCapabilities::ANSI
};

static NATIVE_TYPES: &[(&str, NativeType)] = &[
    ("primary_key", NativeType::new("bigserial primary key")),
    ("string", NativeType::new("character varying")),
    ("text", NativeType::new("text")),
    ("integer", NativeType::new("integer")),
    ("bigint", NativeType::new("bigint")),
    ("float", NativeType::new("float")),
    ("decimal", NativeType::new("decimal")),
    ("datetime", NativeType::new("timestamp")),
    ("time", NativeType::new("time")),
    ("date", NativeType::new("date")),
    ("binary", NativeType::new("bytea")),
    ("boolean", NativeType::new("boolean")),
    ("uuid", NativeType::new("uuid")),
    ("json", NativeType::new("json")),
    ("jsonb", NativeType::new("jsonb")),
    ("xml", NativeType::new("xml")),
];

fn re(source: &str) -> Regex {
    Regex::new(source).expect("type patterns are valid")
}

static TYPE_MAP: LazyLock<TypeMap> = LazyLock::new(|| {
    TypeMap::new()
        .register("smallint", |t| TypeDescriptor::new(TypeKind::Integer, t).limit(2))
        .register("integer", |t| TypeDescriptor::new(TypeKind::Integer, t).limit(4))
        .register("bigint", |t| TypeDescriptor::new(TypeKind::BigInteger, t).limit(8))
        .register("real", |t| TypeDescriptor::new(TypeKind::Float, t))
        .register("double precision", |t| TypeDescriptor::new(TypeKind::Float, t))
        .register("text", |t| TypeDescriptor::new(TypeKind::Text, t))
        .register("bytea", |t| TypeDescriptor::new(TypeKind::Binary, t))
        .register("boolean", |t| TypeDescriptor::new(TypeKind::Boolean, t))
        .register("date", |t| TypeDescriptor::new(TypeKind::Date, t))
        .register("uuid", |t| TypeDescriptor::new(TypeKind::Uuid, t))
        .register("json", |t| TypeDescriptor::new(TypeKind::Json, t))
        .register("jsonb", |t| TypeDescriptor::new(TypeKind::Json, t))
        .register("xml", |t| TypeDescriptor::new(TypeKind::Xml, t))
        .register("money", |t| TypeDescriptor::new(TypeKind::Money, t))
        .register_pattern(re(r"^numeric\(\d+,\s*0\)$"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::DecimalWithoutScale, t)
        })
        .register_pattern(re(r"^numeric"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::Decimal, t)
        })
        .register_pattern(re(r"^(character varying|varchar)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        .register_pattern(re(r"^(character|char|bpchar)\b"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        .register_pattern(re(r"^timestamp"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::DateTime, t)
        })
        .register_pattern(re(r"^time"), |t| TypeDescriptor::with_precision_from(TypeKind::Time, t))
        .alias("int2", "smallint")
        .alias("int4", "integer")
        .alias("int", "integer")
        .alias("int8", "bigint")
        .alias("float4", "real")
        .alias("float8", "double precision")
        .alias("bool", "boolean")
        .alias("decimal", "numeric")
});

static QUOTED_CAST: LazyLock<Regex> = LazyLock::new(|| re(r#"(?s)^\(?'(.*)'::[\w\s"\[\]]+\)?$"#));
static NUMERIC_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| re(r"^\(?(-?\d+(\.\d*)?)\)?(::(bigint|integer|numeric|smallint))?$"));
static NULL_CAST: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^NULL(::[\w\s]+)?$"));

static TRANSLATOR: LazyLock<ErrorTranslator> = LazyLock::new(ErrorTranslator::postgres);

/// PostgreSQL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn capabilities(&self) -> &DialectCapabilities {
        &CAPABILITIES
    }

    /// Reads defaults in PostgreSQL's catalog form, such as
    /// `'abc'::character varying`, `(-1)::integer` or `nextval('seq'::regclass)`.
    fn parse_default(&self, raw: &str, descriptor: &TypeDescriptor) -> Option<ColumnDefault> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || NULL_CAST.is_match(trimmed) {
            return None;
        }
        if let Some(caps) = QUOTED_CAST.captures(trimmed) {
            let text = caps[1].replace("''", "'");
            return Some(
                descriptor
                    .cast(&text)
                    .map_or_else(|| ColumnDefault::Function(trimmed.to_string()), ColumnDefault::Value),
            );
        }
        match trimmed {
            "true" => return Some(ColumnDefault::Value(SqlValue::Bool(true))),
            "false" => return Some(ColumnDefault::Value(SqlValue::Bool(false))),
            _ => {}
        }
        if let Some(caps) = NUMERIC_DEFAULT.captures(trimmed) {
            if let Some(value) = descriptor.cast(&caps[1]) {
                return Some(ColumnDefault::Value(value));
            }
        }
        Some(ColumnDefault::Function(trimmed.to_string()))
    }

    fn native_types(&self) -> NativeTypes {
        NativeTypes::new(NATIVE_TYPES)
    }

    fn type_map(&self) -> &TypeMap {
        &TYPE_MAP
    }

    fn type_to_sql(&self, logical: &str, options: TypeOptions) -> Result<String> {
        if logical == "integer" {
            return Ok(String::from(match options.limit {
                Some(1 | 2) => "smallint",
                None | Some(3 | 4) => "integer",
                Some(_) => "bigint",
            }));
        }
        Ok(self
            .native_types()
            .get(logical)
            .map_or_else(|| logical.to_string(), |native| render_native(native, options)))
    }

    fn error_translator(&self) -> &ErrorTranslator {
        &TRANSLATOR
    }
}
