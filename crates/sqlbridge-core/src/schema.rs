//! Column metadata and the schema cache interface.
//!
//! The compiler reads primary keys and columns through [`SchemaCache`]; how
//! the cache is populated is up to the caller.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::value::SqlValue;

/// Default of a column: a literal value or a database-evaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    /// Literal used to pre-populate new rows.
    Value(SqlValue),
    /// Generator expression such as `getdate()`, passed through as-is.
    Function(String),
}

impl ColumnDefault {
    /// The literal value, if this is not a generator expression.
    #[must_use]
    pub const fn value(&self) -> Option<&SqlValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Function(_) => None,
        }
    }

    /// The generator expression, if any.
    #[must_use]
    pub fn function(&self) -> Option<&str> {
        match self {
            Self::Function(expr) => Some(expr),
            Self::Value(_) => None,
        }
    }
}

/// Whether a native type string declares an identity column.
///
/// Identity is read off the type string (`int identity`), not from a
/// separate metadata flag.
#[must_use]
pub fn sql_type_marks_identity(sql_type: &str) -> bool {
    sql_type.to_ascii_lowercase().contains("identity")
}

/// Metadata of a single column.
///
/// Equality includes the owning table so that identically named columns
/// of joined tables stay distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    /// Column name.
    pub name: String,
    /// Native type string.
    pub sql_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Column default.
    pub default: Option<ColumnDefault>,
    /// Owning table.
    pub table_name: Option<String>,
}

impl ColumnMetadata {
    /// Creates a nullable column without default.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            default: None,
            table_name: None,
        }
    }

    /// Sets nullability.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the default.
    #[must_use]
    pub fn default_value(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the owning table.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    /// Whether this is an identity column.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        sql_type_marks_identity(&self.sql_type)
    }

    /// Whether the default is a generator expression.
    #[must_use]
    pub fn has_default_function(&self) -> bool {
        matches!(self.default, Some(ColumnDefault::Function(_)))
    }
}

/// Read access to table metadata.
pub trait SchemaCache: Send + Sync {
    /// Primary key columns of `table`, in key order. Empty when unknown.
    fn primary_keys(&self, table: &str) -> Vec<String>;

    /// Columns of `table`, in ordinal order. Empty when unknown.
    fn columns(&self, table: &str) -> Vec<ColumnMetadata>;

    /// The identity column of `table`, if any.
    fn identity_column(&self, table: &str) -> Option<ColumnMetadata> {
        self.columns(table).into_iter().find(ColumnMetadata::is_identity)
    }
}

#[derive(Debug, Clone, Default)]
struct TableSchema {
    primary_keys: Vec<String>,
    columns: Vec<ColumnMetadata>,
}

/// In-memory [`SchemaCache`] with per-table invalidation.
#[derive(Debug, Default)]
pub struct MemorySchemaCache {
    tables: RwLock<HashMap<String, TableSchema>>,
}

impl MemorySchemaCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the metadata of `table`, replacing earlier entries.
    pub fn add_table(&self, table: &str, primary_keys: &[&str], columns: Vec<ColumnMetadata>) {
        let columns = columns
            .into_iter()
            .map(|column| match column.table_name {
                Some(_) => column,
                None => column.table(table),
            })
            .collect();
        let schema = TableSchema {
            primary_keys: primary_keys.iter().map(|key| String::from(*key)).collect(),
            columns,
        };
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string(), schema);
    }

    /// Drops cached metadata of `table`, e.g. after DDL.
    pub fn invalidate(&self, table: &str) {
        debug!(table = %table, "Invalidating cached table metadata");
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(table);
    }

    /// Drops all cached metadata.
    pub fn clear(&self) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether metadata for `table` is cached.
    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(table)
    }
}

impl SchemaCache for MemorySchemaCache {
    fn primary_keys(&self, table: &str) -> Vec<String> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map(|schema| schema.primary_keys.clone())
            .unwrap_or_default()
    }

    fn columns(&self, table: &str) -> Vec<ColumnMetadata> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map(|schema| schema.columns.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_predicate() {
        assert!(sql_type_marks_identity("int identity"));
        assert!(sql_type_marks_identity("BIGINT IDENTITY"));
        assert!(!sql_type_marks_identity("int"));
    }

    #[test]
    fn test_column_equality_includes_table() {
        let a = ColumnMetadata::new("id", "int").table("users");
        let b = ColumnMetadata::new("id", "int").table("posts");
        assert_ne!(a, b);
        assert_eq!(a, ColumnMetadata::new("id", "int").table("users"));
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = MemorySchemaCache::new();
        cache.add_table(
            "users",
            &["id"],
            vec![ColumnMetadata::new("id", "int identity").nullable(false)],
        );
        assert_eq!(cache.primary_keys("users"), vec![String::from("id")]);
        assert_eq!(cache.columns("users")[0].table_name.as_deref(), Some("users"));
        assert_eq!(cache.identity_column("users").map(|c| c.name), Some(String::from("id")));

        cache.invalidate("users");
        assert!(!cache.contains("users"));
        assert!(cache.primary_keys("users").is_empty());
    }

    #[test]
    fn test_default_accessors() {
        let literal = ColumnDefault::Value(SqlValue::Int(0));
        assert_eq!(literal.value(), Some(&SqlValue::Int(0)));
        assert_eq!(literal.function(), None);
        let generated = ColumnDefault::Function(String::from("getdate()"));
        assert_eq!(generated.function(), Some("getdate()"));
    }
}
