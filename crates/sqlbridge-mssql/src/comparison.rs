//! Equality comparisons that respect SQL Server collations.
//!
//! Most SQL Server databases use a case-insensitive collation, so a plain
//! `=` on character columns ignores case. Comparisons that must be exact
//! mark the compared value with [`Expr::Bin`], which the dialect renders
//! with its binary collation.

use sqlbridge_core::ast::Expr;
use sqlbridge_core::schema::ColumnMetadata;
use sqlbridge_core::types::TypeKind;
use sqlbridge_core::value::SqlValue;

use crate::types::TYPE_MAP;

/// Whether `collation` already compares case-sensitively.
#[must_use]
pub fn is_case_sensitive_collation(collation: Option<&str>) -> bool {
    collation.is_some_and(|name| name.contains("_CS"))
}

/// Whether comparisons on `column` ignore case under `collation`.
#[must_use]
pub fn compares_case_insensitively(column: &ColumnMetadata, collation: Option<&str>) -> bool {
    let kind = TYPE_MAP.lookup_or_default(&column.sql_type).kind;
    matches!(kind, TypeKind::String | TypeKind::Text) && !is_case_sensitive_collation(collation)
}

/// `column = value`, forced case-sensitive when the column is character
/// data under a case-insensitive collation and `value` is not NULL.
#[must_use]
pub fn case_sensitive_comparison(column: &ColumnMetadata, value: Expr, collation: Option<&str>) -> Expr {
    let attribute = column_reference(column);
    if compares_case_insensitively(column, collation) && !is_null(&value) {
        attribute.eq(value.bin())
    } else {
        attribute.eq(value)
    }
}

fn column_reference(column: &ColumnMetadata) -> Expr {
    match &column.table_name {
        Some(table) => Expr::qualified_column(table.as_str(), column.name.as_str()),
        None => Expr::column(column.name.as_str()),
    }
}

const fn is_null(value: &Expr) -> bool {
    matches!(value, Expr::Value(SqlValue::Null) | Expr::Bind(SqlValue::Null))
}
