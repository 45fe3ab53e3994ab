//! Dialect compiler.
//!
//! Compilation runs in two passes over a private copy of the caller's tree:
//!
//! 1. **Rewrite**: capability-driven tree changes (EXISTS checks, synthetic
//!    limits and offsets, deterministic paging order, ORDER BY stripping in
//!    derived tables, keyed subselects for limited UPDATE/DELETE).
//! 2. **Render**: the rewritten tree is written out as SQL text, collecting
//!    bind values in placeholder order.
//!
//! The rewritten tree is returned with the SQL so callers can inspect it;
//! compiling it again yields the same SQL.

mod render;
mod rewrite;

use tracing::debug;

use crate::ast::Statement;
use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::schema::SchemaCache;
use crate::value::SqlValue;

/// Output of [`Compiler::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text with positional placeholders.
    pub sql: String,
    /// Bind values, in placeholder order.
    pub binds: Vec<SqlValue>,
    /// The tree after rewriting.
    pub statement: Statement,
}

/// Compiles query trees for one dialect.
#[derive(Clone, Copy)]
pub struct Compiler<'a> {
    dialect: &'a dyn Dialect,
    schema: &'a dyn SchemaCache,
}

impl std::fmt::Debug for Compiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("dialect", &self.dialect.name())
            .finish_non_exhaustive()
    }
}

impl<'a> Compiler<'a> {
    /// Creates a compiler for `dialect` that resolves keys through `schema`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect, schema: &'a dyn SchemaCache) -> Self {
        Self { dialect, schema }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    /// Compiles `statement` without modifying it.
    pub fn compile(&self, statement: &Statement) -> Result<CompiledQuery, CompileError> {
        let mut rewritten = statement.clone();
        self.rewrite_statement(&mut rewritten)?;

        let mut writer = render::SqlWriter::new(self.dialect.parameter_placeholder());
        self.emit_statement(&rewritten, &mut writer)?;
        let (sql, binds) = writer.finish();

        debug!(
            dialect = self.dialect.name(),
            sql = %sql,
            binds = binds.len(),
            "Compiled statement"
        );

        Ok(CompiledQuery {
            sql,
            binds,
            statement: rewritten,
        })
    }
}
