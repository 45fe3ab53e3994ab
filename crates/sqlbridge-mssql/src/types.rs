//! SQL Server native types.
//!
//! [`NATIVE_TYPES`] drives DDL generation, [`TYPE_MAP`] classifies the type
//! strings reported by `INFORMATION_SCHEMA` and `sp_columns`.

use std::sync::LazyLock;

use regex::Regex;
use sqlbridge_core::error::{AdapterError, Result};
use sqlbridge_core::types::{render_native, NativeType, NativeTypes, TypeDescriptor, TypeKind, TypeMap, TypeOptions};

/// Limit that maps `string` onto `nvarchar(max)`.
pub const MAX_STRING_LIMIT: u32 = 1_073_741_823;

/// Default and maximum fractional second precision of `datetime2` and `time`.
pub const MAX_TIME_PRECISION: u32 = 7;

/// Logical types that never carry a size in DDL.
const NO_LIMIT_TYPES: &[&str] = &["text", "binary", "boolean", "date"];

pub(crate) static NATIVE_TYPES: &[(&str, NativeType)] = &[
    ("primary_key", NativeType::new("bigint NOT NULL IDENTITY(1,1) PRIMARY KEY")),
    ("integer", NativeType::with_limit("int", 4)),
    ("boolean", NativeType::new("bit")),
    ("decimal", NativeType::new("decimal")),
    ("float", NativeType::new("float")),
    ("date", NativeType::new("date")),
    ("time", NativeType::new("time")),
    ("datetime", NativeType::new("datetime2")),
    ("string", NativeType::with_limit("nvarchar", 4000)),
    ("text", NativeType::new("nvarchar(max)")),
    ("binary", NativeType::new("varbinary(max)")),
    // Other types, not in the common logical set
    ("bigint", NativeType::new("bigint")),
    ("smalldatetime", NativeType::new("smalldatetime")),
    ("datetime_basic", NativeType::new("datetime")),
    ("timestamp", NativeType::new("datetime")),
    ("real", NativeType::new("real")),
    ("money", NativeType::new("money")),
    ("smallmoney", NativeType::new("smallmoney")),
    ("char", NativeType::new("char")),
    ("nchar", NativeType::new("nchar")),
    ("varchar", NativeType::with_limit("varchar", 8000)),
    ("varchar_max", NativeType::new("varchar(max)")),
    ("uuid", NativeType::new("uniqueidentifier")),
    ("binary_basic", NativeType::new("binary")),
    ("varbinary", NativeType::with_limit("varbinary", 8000)),
    // Deprecated SQL Server types
    ("image", NativeType::new("image")),
    ("ntext", NativeType::new("ntext")),
    ("text_basic", NativeType::new("text")),
];

fn re(source: &str) -> Regex {
    Regex::new(source).expect("type patterns are valid")
}

fn decimal(sql_type: &str) -> TypeDescriptor {
    let descriptor = TypeDescriptor::with_precision_from(TypeKind::Decimal, sql_type);
    if descriptor.scale.unwrap_or(0) == 0 {
        TypeDescriptor {
            kind: TypeKind::DecimalWithoutScale,
            ..descriptor
        }
    } else {
        descriptor
    }
}

pub(crate) static TYPE_MAP: LazyLock<TypeMap> = LazyLock::new(|| {
    TypeMap::new()
        // Exact numerics
        .register("int", |t| TypeDescriptor::new(TypeKind::Integer, t).limit(4))
        .register("tinyint", |t| TypeDescriptor::new(TypeKind::Integer, t).limit(1))
        .register("smallint", |t| TypeDescriptor::new(TypeKind::Integer, t).limit(2))
        .register("bigint", |t| TypeDescriptor::new(TypeKind::BigInteger, t).limit(8))
        .register_pattern(re(r"^decimal"), decimal)
        .register("money", |t| TypeDescriptor::new(TypeKind::Money, t))
        .register("smallmoney", |t| TypeDescriptor::new(TypeKind::Money, t))
        // Approximate numerics
        .register("float", |t| TypeDescriptor::new(TypeKind::Float, t))
        .register("real", |t| TypeDescriptor::new(TypeKind::Float, t))
        // Character strings
        .register("varchar(max)", |t| TypeDescriptor::new(TypeKind::Text, t))
        .register_pattern(re(r"^varchar\(\d+\)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        .register_pattern(re(r"^char\(\d+\)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        // Unicode character strings
        .register("nvarchar(max)", |t| TypeDescriptor::new(TypeKind::Text, t))
        .register("nvarchar(4000)", |t| TypeDescriptor::new(TypeKind::String, t).limit(4000))
        .register_pattern(re(r"^nvarchar\(\d+\)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        .register_pattern(re(r"^nchar\(\d+\)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::String, t)
        })
        // Binary strings
        .register("varbinary(max)", |t| TypeDescriptor::new(TypeKind::Binary, t))
        .register_pattern(re(r"^binary\(\d+\)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::Binary, t)
        })
        .register_pattern(re(r"^varbinary\(\d+\)"), |t| {
            TypeDescriptor::with_limit_from(TypeKind::Binary, t)
        })
        // Other data types
        .register("bit", |t| TypeDescriptor::new(TypeKind::Boolean, t))
        .register("uniqueidentifier", |t| TypeDescriptor::new(TypeKind::Uuid, t))
        .register("xml", |t| TypeDescriptor::new(TypeKind::Xml, t))
        // Date and time
        .register("date", |t| TypeDescriptor::new(TypeKind::Date, t))
        .register("datetime", |t| TypeDescriptor::new(TypeKind::DateTime, t))
        .register("smalldatetime", |t| TypeDescriptor::new(TypeKind::DateTime, t))
        .register_pattern(re(r"^time\(\d+\)"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::Time, t)
        })
        .register_pattern(re(r"^datetime2\(\d+\)"), |t| {
            TypeDescriptor::with_precision_from(TypeKind::DateTime, t)
        })
        // Deprecated types
        .register("text", |t| TypeDescriptor::new(TypeKind::Text, t))
        .register("ntext", |t| TypeDescriptor::new(TypeKind::Text, t))
        .register("image", |t| TypeDescriptor::new(TypeKind::Binary, t))
        // Aliases
        .alias("int identity", "int")
        .alias("bigint identity", "bigint")
        .alias("integer", "int")
        .register_pattern(re(r"^numeric"), decimal)
        .register_pattern(re(r"^number"), decimal)
        .alias("double", "float")
        .alias("string", "nvarchar(4000)")
        .alias("boolean", "bit")
        .alias("time", "time(7)")
        .alias("binary", "varbinary(max)")
        .alias("blob", "varbinary(max)")
        .alias("datetime2", "datetime2(7)")
});

/// Native table wrapper handed out by the dialect.
pub(crate) const fn native_types() -> NativeTypes {
    NativeTypes::new(NATIVE_TYPES)
}

/// Renders the SQL Server type for a logical type.
///
/// # Errors
///
/// Returns [`AdapterError::InvalidArgument`] for a `datetime` or `time`
/// precision outside `0..=7`.
pub fn type_to_sql(logical: &str, options: TypeOptions) -> Result<String> {
    let natives = native_types();
    match logical {
        "string" if options.limit == Some(MAX_STRING_LIMIT) => Ok(String::from("nvarchar(max)")),
        "integer" => Ok(String::from(match options.limit {
            None | Some(4) => "int",
            Some(2) => "smallint",
            Some(1) => "tinyint",
            Some(_) => "bigint",
        })),
        "uniqueidentifier" => Ok(logical.to_string()),
        "datetime" | "time" => {
            let native = natives.get(logical).map_or(logical, |native| native.name);
            let precision = options.precision.unwrap_or(MAX_TIME_PRECISION);
            if precision > MAX_TIME_PRECISION {
                return Err(AdapterError::InvalidArgument(format!(
                    "No {native} type has precision of {precision}. \
                     The allowed range of precision is from 0 to {MAX_TIME_PRECISION}"
                )));
            }
            Ok(format!("{native}({precision})"))
        }
        _ => {
            let options = if NO_LIMIT_TYPES.contains(&logical) {
                TypeOptions::new()
            } else {
                options
            };
            Ok(natives
                .get(logical)
                .map_or_else(|| logical.to_string(), |native| render_native(native, options)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(sql_type: &str) -> TypeDescriptor {
        TYPE_MAP.lookup_or_default(sql_type)
    }

    #[test]
    fn test_integer_limits() {
        assert_eq!(lookup("tinyint").limit, Some(1));
        assert_eq!(lookup("int identity").kind, TypeKind::Integer);
        assert_eq!(lookup("int identity").sql_type, "int identity");
        assert_eq!(lookup("bigint identity").kind, TypeKind::BigInteger);
    }

    #[test]
    fn test_character_types() {
        assert_eq!(lookup("nvarchar(max)").kind, TypeKind::Text);
        assert_eq!(lookup("varchar(max)").kind, TypeKind::Text);
        let bounded = lookup("nvarchar(50)");
        assert_eq!(bounded.kind, TypeKind::String);
        assert_eq!(bounded.limit, Some(50));
        assert_eq!(lookup("string").limit, Some(4000));
        assert_eq!(lookup("nchar(10)").limit, Some(10));
    }

    #[test]
    fn test_decimal_scale() {
        assert_eq!(lookup("decimal(10,0)").kind, TypeKind::DecimalWithoutScale);
        let money = lookup("numeric(12,2)");
        assert_eq!(money.kind, TypeKind::Decimal);
        assert_eq!(money.scale, Some(2));
        assert_eq!(lookup("smallmoney").kind, TypeKind::Money);
    }

    #[test]
    fn test_temporal_types() {
        assert_eq!(lookup("datetime2").precision, Some(7));
        assert_eq!(lookup("datetime2(3)").precision, Some(3));
        assert_eq!(lookup("time").kind, TypeKind::Time);
        assert_eq!(lookup("smalldatetime").kind, TypeKind::DateTime);
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(lookup("geography").kind, TypeKind::Other);
    }

    #[test]
    fn test_type_to_sql_limits() {
        let sql = |logical: &str, options: TypeOptions| type_to_sql(logical, options).unwrap();
        assert_eq!(sql("string", TypeOptions::new()), "nvarchar(4000)");
        assert_eq!(sql("string", TypeOptions::new().limit(40)), "nvarchar(40)");
        assert_eq!(sql("string", TypeOptions::new().limit(MAX_STRING_LIMIT)), "nvarchar(max)");
        assert_eq!(sql("text", TypeOptions::new().limit(40)), "nvarchar(max)");
        assert_eq!(sql("boolean", TypeOptions::new().limit(1)), "bit");
        assert_eq!(sql("date", TypeOptions::new().limit(3)), "date");
        assert_eq!(sql("integer", TypeOptions::new().limit(1)), "tinyint");
        assert_eq!(sql("integer", TypeOptions::new().limit(2)), "smallint");
        assert_eq!(sql("integer", TypeOptions::new()), "int");
        assert_eq!(sql("integer", TypeOptions::new().limit(8)), "bigint");
        assert_eq!(
            sql("decimal", TypeOptions::new().precision(10).scale(2)),
            "decimal(10,2)"
        );
        assert_eq!(sql("uniqueidentifier", TypeOptions::new()), "uniqueidentifier");
        assert_eq!(sql("geography", TypeOptions::new()), "geography");
    }

    #[test]
    fn test_type_to_sql_precision() {
        assert_eq!(type_to_sql("datetime", TypeOptions::new()).unwrap(), "datetime2(7)");
        assert_eq!(
            type_to_sql("datetime", TypeOptions::new().precision(0)).unwrap(),
            "datetime2(0)"
        );
        assert_eq!(type_to_sql("time", TypeOptions::new().precision(3)).unwrap(), "time(3)");
        let err = type_to_sql("datetime", TypeOptions::new().precision(8)).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidArgument(_)));
        assert!(err.to_string().contains("No datetime2 type has precision of 8"));
    }
}
