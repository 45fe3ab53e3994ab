//! Type descriptors, native type tables and the native type map.
//!
//! Two directions are covered:
//!
//! - [`NativeTypes`] turns a logical type name (`string`, `integer`, ...)
//!   into the native type used in DDL.
//! - [`TypeMap`] turns a native type string reported by the database
//!   (`nvarchar(50)`, `decimal(10,2)`, ...) into a [`TypeDescriptor`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::quoting;
use crate::value::SqlValue;

/// Coarse classification of a native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// 8 to 32 bit integers.
    Integer,
    /// 64 bit integers.
    BigInteger,
    /// Exact numeric with scale.
    Decimal,
    /// Exact numeric declared with a scale of zero.
    DecimalWithoutScale,
    /// Approximate numeric.
    Float,
    /// Currency.
    Money,
    /// Bounded character data.
    String,
    /// Unbounded character data.
    Text,
    /// Binary data.
    Binary,
    /// Boolean, possibly stored as a number.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp.
    DateTime,
    /// UUID / uniqueidentifier.
    Uuid,
    /// XML document.
    Xml,
    /// JSON document.
    Json,
    /// Anything the map does not classify.
    Other,
}

/// A resolved native column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Classification.
    pub kind: TypeKind,
    /// The native type string as declared.
    pub sql_type: String,
    /// Length limit.
    pub limit: Option<u32>,
    /// Numeric or fractional-second precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
}

impl TypeDescriptor {
    /// Creates a descriptor without size information.
    #[must_use]
    pub fn new(kind: TypeKind, sql_type: impl Into<String>) -> Self {
        Self {
            kind,
            sql_type: sql_type.into(),
            limit: None,
            precision: None,
            scale: None,
        }
    }

    /// Creates a descriptor and reads `(limit)` from the type string.
    #[must_use]
    pub fn with_limit_from(kind: TypeKind, sql_type: &str) -> Self {
        Self {
            limit: extract_limit(sql_type),
            ..Self::new(kind, sql_type)
        }
    }

    /// Creates a descriptor and reads `(precision, scale)` from the type string.
    #[must_use]
    pub fn with_precision_from(kind: TypeKind, sql_type: &str) -> Self {
        let (precision, scale) = extract_precision_scale(sql_type);
        Self {
            precision,
            scale,
            ..Self::new(kind, sql_type)
        }
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the precision.
    #[must_use]
    pub const fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Casts raw default text into a typed value.
    ///
    /// Returns `None` when the text cannot be read as this type.
    #[must_use]
    pub fn cast(&self, raw: &str) -> Option<SqlValue> {
        let trimmed = raw.trim();
        match self.kind {
            TypeKind::Integer | TypeKind::BigInteger => trimmed.parse().ok().map(SqlValue::Int),
            TypeKind::DecimalWithoutScale => trimmed
                .parse()
                .ok()
                .map(SqlValue::Int)
                .or_else(|| numeric_text(trimmed)),
            TypeKind::Decimal | TypeKind::Money => numeric_text(trimmed),
            TypeKind::Float => trimmed.parse().ok().map(SqlValue::Float),
            TypeKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" | "t" => Some(SqlValue::Bool(true)),
                "0" | "false" | "f" => Some(SqlValue::Bool(false)),
                _ => None,
            },
            TypeKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(SqlValue::Date),
            TypeKind::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
                .ok()
                .map(SqlValue::Time),
            TypeKind::DateTime => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok()
                .map(SqlValue::DateTime),
            TypeKind::Binary => Some(SqlValue::Blob(raw.as_bytes().to_vec())),
            TypeKind::String
            | TypeKind::Text
            | TypeKind::Uuid
            | TypeKind::Xml
            | TypeKind::Json
            | TypeKind::Other => Some(SqlValue::Text(raw.to_string())),
        }
    }
}

fn numeric_text(raw: &str) -> Option<SqlValue> {
    quoting::is_decimal_literal(raw).then(|| SqlValue::Decimal(raw.to_string()))
}

/// Reads the single size argument of `name(n)`.
#[must_use]
pub fn extract_limit(sql_type: &str) -> Option<u32> {
    let (_, args) = sql_type.split_once('(')?;
    let args = args.split_once(')')?.0;
    if args.contains(',') {
        return None;
    }
    args.trim().parse().ok()
}

/// Reads `name(p)` or `name(p,s)`.
#[must_use]
pub fn extract_precision_scale(sql_type: &str) -> (Option<u32>, Option<u32>) {
    let Some(args) = sql_type
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(args, _)| args)
    else {
        return (None, None);
    };
    let mut parts = args.split(',').map(|part| part.trim().parse::<u32>().ok());
    let precision = parts.next().flatten();
    let scale = parts.next().flatten();
    (precision, scale)
}

/// Builds a descriptor from the full native type string.
pub type DescriptorBuilder = fn(&str) -> TypeDescriptor;

#[derive(Debug)]
enum Matcher {
    Exact(String),
    Pattern(Regex),
}

#[derive(Debug)]
enum Target {
    Build(DescriptorBuilder),
    Alias(String),
}

#[derive(Debug)]
struct TypeRule {
    matcher: Matcher,
    target: Target,
}

const MAX_ALIAS_DEPTH: usize = 8;

/// Registry of native type strings.
///
/// Lookups try exact names first, then patterns; both in registration
/// order, first match wins. Matching is case-insensitive.
#[derive(Debug, Default)]
pub struct TypeMap {
    rules: Vec<TypeRule>,
}

impl TypeMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registers an exact native type name.
    #[must_use]
    pub fn register(mut self, name: &str, build: DescriptorBuilder) -> Self {
        self.rules.push(TypeRule {
            matcher: Matcher::Exact(name.to_ascii_lowercase()),
            target: Target::Build(build),
        });
        self
    }

    /// Registers a pattern matched against the lowercased type string.
    #[must_use]
    pub fn register_pattern(mut self, pattern: Regex, build: DescriptorBuilder) -> Self {
        self.rules.push(TypeRule {
            matcher: Matcher::Pattern(pattern),
            target: Target::Build(build),
        });
        self
    }

    /// Makes `name` resolve like `target`, keeping any `(..)` arguments.
    #[must_use]
    pub fn alias(mut self, name: &str, target: &str) -> Self {
        self.rules.push(TypeRule {
            matcher: Matcher::Exact(name.to_ascii_lowercase()),
            target: Target::Alias(target.to_ascii_lowercase()),
        });
        self
    }

    /// Resolves a native type string.
    #[must_use]
    pub fn lookup(&self, sql_type: &str) -> Option<TypeDescriptor> {
        self.lookup_at_depth(sql_type, 0)
    }

    /// Resolves a native type string, falling back to [`TypeKind::Other`].
    #[must_use]
    pub fn lookup_or_default(&self, sql_type: &str) -> TypeDescriptor {
        self.lookup(sql_type)
            .unwrap_or_else(|| TypeDescriptor::new(TypeKind::Other, sql_type))
    }

    fn lookup_at_depth(&self, sql_type: &str, depth: usize) -> Option<TypeDescriptor> {
        if depth > MAX_ALIAS_DEPTH {
            return None;
        }
        let key = sql_type.trim().to_ascii_lowercase();
        let base = key.split_once('(').map_or(key.as_str(), |(name, _)| name.trim_end());

        let exact = self.rules.iter().find(|rule| match &rule.matcher {
            Matcher::Exact(name) => *name == key,
            Matcher::Pattern(_) => false,
        });
        let rule = exact
            .or_else(|| {
                self.rules.iter().find(|rule| match &rule.matcher {
                    Matcher::Pattern(pattern) => pattern.is_match(&key),
                    Matcher::Exact(_) => false,
                })
            })
            .or_else(|| {
                // `name(args)` with an exact rule registered only for `name`.
                self.rules.iter().find(|rule| match &rule.matcher {
                    Matcher::Exact(name) => base != key && *name == base,
                    Matcher::Pattern(_) => false,
                })
            })?;

        match &rule.target {
            Target::Build(build) => Some(build(sql_type.trim())),
            Target::Alias(target) => {
                let args = key.find('(').map_or("", |idx| &key[idx..]);
                let mut descriptor = self.lookup_at_depth(&format!("{target}{args}"), depth + 1)?;
                descriptor.sql_type = sql_type.trim().to_string();
                Some(descriptor)
            }
        }
    }
}

/// A native type used when generating DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeType {
    /// Native type name.
    pub name: &'static str,
    /// Default length limit.
    pub limit: Option<u32>,
}

impl NativeType {
    /// A native type without a default limit.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name, limit: None }
    }

    /// A native type with a default limit.
    #[must_use]
    pub const fn with_limit(name: &'static str, limit: u32) -> Self {
        Self {
            name,
            limit: Some(limit),
        }
    }
}

/// Logical to native type table of a dialect.
#[derive(Debug, Clone, Copy)]
pub struct NativeTypes(&'static [(&'static str, NativeType)]);

impl NativeTypes {
    /// Wraps a static table.
    #[must_use]
    pub const fn new(table: &'static [(&'static str, NativeType)]) -> Self {
        Self(table)
    }

    /// Looks up a logical type name.
    #[must_use]
    pub fn get(&self, logical: &str) -> Option<&NativeType> {
        self.0
            .iter()
            .find(|(name, _)| *name == logical)
            .map(|(_, native)| native)
    }

    /// Iterates the logical type names.
    pub fn logical_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(name, _)| *name)
    }
}

/// Size options for [`crate::dialect::Dialect::type_to_sql`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeOptions {
    /// Length limit (bytes for integers).
    pub limit: Option<u32>,
    /// Precision.
    pub precision: Option<u32>,
    /// Scale.
    pub scale: Option<u32>,
}

impl TypeOptions {
    /// No size options.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: None,
            precision: None,
            scale: None,
        }
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the precision.
    #[must_use]
    pub const fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets the scale.
    #[must_use]
    pub const fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// Renders a native type with size arguments.
///
/// Types whose name already carries arguments are returned unchanged.
#[must_use]
pub fn render_native(native: &NativeType, options: TypeOptions) -> String {
    if native.name.contains('(') {
        return native.name.to_string();
    }
    match (options.precision, options.scale) {
        (Some(p), Some(s)) => format!("{}({p},{s})", native.name),
        (Some(p), None) => format!("{}({p})", native.name),
        _ => match options.limit.or(native.limit) {
            Some(limit) => format!("{}({limit})", native.name),
            None => native.name.to_string(),
        },
    }
}
