#![allow(dead_code)]

use sqlbridge_core::ast::Statement;
use sqlbridge_core::schema::{ColumnMetadata, MemorySchemaCache};
use sqlbridge_core::{CompileError, CompiledQuery, Compiler, Dialect};

/// Schema with a single-key table, a composite-key table with an identity
/// column and a table without a declared key.
pub fn schema() -> MemorySchemaCache {
    let cache = MemorySchemaCache::new();
    cache.add_table(
        "users",
        &["id"],
        vec![
            ColumnMetadata::new("id", "integer").nullable(false),
            ColumnMetadata::new("name", "varchar(50)"),
            ColumnMetadata::new("active", "boolean"),
        ],
    );
    cache.add_table(
        "memberships",
        &["group_id", "member_id"],
        vec![
            ColumnMetadata::new("group_id", "integer").nullable(false),
            ColumnMetadata::new("member_id", "int identity").nullable(false),
        ],
    );
    cache.add_table(
        "events",
        &[],
        vec![
            ColumnMetadata::new("happened_at", "timestamp"),
            ColumnMetadata::new("payload", "text"),
        ],
    );
    cache
}

pub fn compile(dialect: &dyn Dialect, statement: impl Into<Statement>) -> CompiledQuery {
    let schema = schema();
    let statement = statement.into();
    Compiler::new(dialect, &schema)
        .compile(&statement)
        .unwrap_or_else(|e| panic!("Failed to compile: {statement:?}\nError: {e:?}"))
}

pub fn compile_err(dialect: &dyn Dialect, statement: impl Into<Statement>) -> CompileError {
    let schema = schema();
    let statement = statement.into();
    Compiler::new(dialect, &schema)
        .compile(&statement)
        .expect_err(&format!("Expected compile error for: {statement:?}"))
}

pub fn sql(dialect: &dyn Dialect, statement: impl Into<Statement>) -> String {
    compile(dialect, statement).sql
}

/// Compiling the rewritten tree again must give the same SQL.
pub fn assert_stable(dialect: &dyn Dialect, statement: impl Into<Statement>) {
    let first = compile(dialect, statement);
    let second = compile(dialect, first.statement.clone());
    assert_eq!(first.sql, second.sql, "Recompiling changed the SQL");
    assert_eq!(first.binds, second.binds, "Recompiling changed the binds");
}
