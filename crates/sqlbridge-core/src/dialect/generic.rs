//! Generic SQL dialect.

use std::sync::LazyLock;

use super::{Dialect, DialectCapabilities};
use crate::translate::{ErrorTranslator, GENERIC_TRANSLATOR};
use crate::types::{NativeType, NativeTypes, TypeDescriptor, TypeKind, TypeMap};

static CAPABILITIES: DialectCapabilities = DialectCapabilities::ANSI;

static NATIVE_TYPES: &[(&str, NativeType)] = &[
    ("string", NativeType::with_limit("varchar", 255)),
    ("text", NativeType::new("text")),
    ("integer", NativeType::new("integer")),
    ("bigint", NativeType::new("bigint")),
    ("float", NativeType::new("float")),
    ("decimal", NativeType::new("decimal")),
    ("datetime", NativeType::new("timestamp")),
    ("time", NativeType::new("time")),
    ("date", NativeType::new("date")),
    ("binary", NativeType::new("blob")),
    ("boolean", NativeType::new("boolean")),
];

static TYPE_MAP: LazyLock<TypeMap> = LazyLock::new(|| {
    TypeMap::new()
        .register("integer", |t| TypeDescriptor::new(TypeKind::Integer, t))
        .register("bigint", |t| TypeDescriptor::new(TypeKind::BigInteger, t))
        .register("float", |t| TypeDescriptor::new(TypeKind::Float, t))
        .register("decimal", |t| TypeDescriptor::with_precision_from(TypeKind::Decimal, t))
        .register("varchar", |t| TypeDescriptor::with_limit_from(TypeKind::String, t))
        .register("text", |t| TypeDescriptor::new(TypeKind::Text, t))
        .register("blob", |t| TypeDescriptor::new(TypeKind::Binary, t))
        .register("boolean", |t| TypeDescriptor::new(TypeKind::Boolean, t))
        .register("date", |t| TypeDescriptor::new(TypeKind::Date, t))
        .register("time", |t| TypeDescriptor::new(TypeKind::Time, t))
        .register("timestamp", |t| TypeDescriptor::new(TypeKind::DateTime, t))
        .alias("int", "integer")
        .alias("numeric", "decimal")
});

/// A generic SQL dialect using ANSI SQL standards.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    /// Creates a new generic dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
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
        &GENERIC_TRANSLATOR
    }
}
