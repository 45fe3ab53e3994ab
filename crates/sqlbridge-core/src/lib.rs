//! # sqlbridge-core
//!
//! Dialect-aware building blocks for database adapters that sit on top of a
//! generic driver interface.
//!
//! This crate provides:
//! - An engine-neutral statement tree ([`ast`])
//! - A compiler that rewrites and renders trees for one [`Dialect`]
//! - Type mapping between native column types and logical types
//! - Translation of driver errors into typed [`AdapterError`]s
//! - Dialects for PostgreSQL, SQLite, DB2 and a generic ANSI fallback
//!
//! ## Compiling a query
//!
//! ```rust
//! use sqlbridge_core::ast::{Expr, SelectStatement, TableRef};
//! use sqlbridge_core::dialect::PostgresDialect;
//! use sqlbridge_core::schema::MemorySchemaCache;
//! use sqlbridge_core::{Compiler, SqlValue};
//!
//! let dialect = PostgresDialect::new();
//! let schema = MemorySchemaCache::new();
//! let compiler = Compiler::new(&dialect, &schema);
//!
//! let select = SelectStatement::from_table(TableRef::table("users"))
//!     .column(Expr::column("id"))
//!     .filter(Expr::column("name").eq(Expr::bind("alice")));
//! let compiled = compiler.compile(&select.into()).unwrap();
//!
//! assert_eq!(compiled.sql, "SELECT \"id\" FROM \"users\" WHERE \"name\" = ?");
//! assert_eq!(compiled.binds, vec![SqlValue::Text(String::from("alice"))]);
//! ```
//!
//! Engine-specific crates implement [`Dialect`] and reuse the compiler;
//! capabilities such as paging syntax or lock placement are declared in a
//! [`dialect::DialectCapabilities`] table rather than by subclassing.

pub mod ast;
pub mod compiler;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod quoting;
pub mod schema;
pub mod translate;
pub mod types;
pub mod value;

pub use ast::{Expr, Statement};
pub use compiler::{CompiledQuery, Compiler};
pub use connection::{Credentials, Driver, DriverError, RawConnection, RowSet};
pub use dialect::Dialect;
pub use error::{AdapterError, CompileError, ErrorKind, Result, StatementError};
pub use schema::{ColumnDefault, ColumnMetadata, MemorySchemaCache, SchemaCache};
pub use translate::ErrorTranslator;
pub use types::{TypeDescriptor, TypeKind, TypeMap};
pub use value::{SqlValue, ToSqlValue};
