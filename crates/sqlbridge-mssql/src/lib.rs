//! # sqlbridge-mssql
//!
//! Microsoft SQL Server support for sqlbridge.
//!
//! This crate provides:
//! - [`SqlServerDialect`]: bracket quoting, unicode literals, the native
//!   type table and type map, default extraction and error rules
//! - [`SqlServerAdapter`]: a blocking adapter over any
//!   [`sqlbridge_core::Driver`] that checks the server version, handles
//!   explicit identity inserts, truncates tables with constraint checks
//!   suspended and explains queries
//! - [`ConnectionConfig`]: serde-backed settings and JDBC URL building
//!
//! ## Compiling for SQL Server
//!
//! ```rust
//! use sqlbridge_core::ast::{Expr, SelectStatement, TableRef};
//! use sqlbridge_core::schema::{ColumnMetadata, MemorySchemaCache};
//! use sqlbridge_core::Compiler;
//! use sqlbridge_mssql::SqlServerDialect;
//!
//! let dialect = SqlServerDialect::new();
//! let schema = MemorySchemaCache::new();
//! schema.add_table("users", &["id"], vec![ColumnMetadata::new("id", "int identity")]);
//!
//! let select = SelectStatement::from_table(TableRef::table("users"))
//!     .column(Expr::column("id"))
//!     .limit(Expr::integer(10));
//! let compiled = Compiler::new(&dialect, &schema).compile(&select.into()).unwrap();
//!
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT [id] FROM [users] ORDER BY [users].[id] ASC OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
//! );
//! ```

pub mod adapter;
pub mod column;
pub mod comparison;
pub mod config;
pub mod dialect;
pub mod errors;
pub mod explain;
pub mod scope;
pub mod statements;
pub mod types;
pub mod utils;
pub mod version;

pub use adapter::SqlServerAdapter;
pub use comparison::case_sensitive_comparison;
pub use config::{ConfigError, ConnectionConfig, IsolationLevel};
pub use dialect::SqlServerDialect;
pub use scope::SessionScope;
pub use statements::{combine_bind_parameters, ClauseBinds, IdentityInsertScope};
pub use version::ServerVersion;
