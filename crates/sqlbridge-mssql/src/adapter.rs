//! Connection-managing SQL Server adapter.
//!
//! The adapter owns one driver session behind a mutex. It is opened lazily
//! (or with [`SqlServerAdapter::connect`]), checked against the minimum
//! server version and configured before any statement runs. All calls
//! block.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use regex::Regex;
use sqlbridge_core::ast::{Expr, InsertStatement, Statement};
use sqlbridge_core::compiler::{CompiledQuery, Compiler};
use sqlbridge_core::connection::{Driver, RawConnection, RowSet};
use sqlbridge_core::dialect::Dialect;
use sqlbridge_core::error::{AdapterError, Result, StatementError};
use sqlbridge_core::schema::{ColumnMetadata, SchemaCache};
use sqlbridge_core::value::SqlValue;
use tracing::{debug, info, warn};

use crate::comparison;
use crate::config::ConnectionConfig;
use crate::dialect::SqlServerDialect;
use crate::errors;
use crate::explain::{self, PrinterTable, SHOWPLAN_OFF, SHOWPLAN_ON};
use crate::scope::SessionScope;
use crate::statements;
use crate::version::{ServerVersion, VERSION_QUERY};

static TRUNCATE_REFERENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Cannot truncate table .* because it is being referenced by a FOREIGN KEY constraint")
        .expect("adapter patterns are valid")
});

/// Server-wide collation, e.g. `SQL_Latin1_General_CP1_CI_AS`.
pub const COLLATION_QUERY: &str = "SELECT Collation = CAST(SERVERPROPERTY('Collation') AS NVARCHAR(128))";

/// Schema and table of every table that declares a foreign key.
pub const REFERENCING_TABLES_QUERY: &str = "SELECT s.name, o.name FROM sys.foreign_keys i \
     INNER JOIN sys.objects o ON i.parent_object_id = o.OBJECT_ID \
     INNER JOIN sys.schemas s ON o.schema_id = s.schema_id";

struct Session<C> {
    connection: C,
    version: ServerVersion,
    collation: Option<String>,
}

/// SQL Server adapter over a [`Driver`].
pub struct SqlServerAdapter<D: Driver> {
    driver: D,
    config: ConnectionConfig,
    dialect: SqlServerDialect,
    schema: Arc<dyn SchemaCache>,
    session: Mutex<Option<Session<D::Connection>>>,
}

impl<D: Driver> std::fmt::Debug for SqlServerAdapter<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerAdapter")
            .field("host", &self.config.host)
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> SqlServerAdapter<D> {
    /// Creates an adapter. No connection is opened yet.
    #[must_use]
    pub fn new(driver: D, config: ConnectionConfig, schema: Arc<dyn SchemaCache>) -> Self {
        let dialect = SqlServerDialect::new().with_timezone(config.default_timezone);
        Self {
            driver,
            config,
            dialect,
            schema,
            session: Mutex::new(None),
        }
    }

    /// The dialect used for compiling and quoting.
    #[must_use]
    pub const fn dialect(&self) -> &SqlServerDialect {
        &self.dialect
    }

    /// The connection settings.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The schema cache used for keys and identity columns.
    #[must_use]
    pub fn schema(&self) -> &dyn SchemaCache {
        self.schema.as_ref()
    }

    /// A compiler for this adapter's dialect and schema.
    #[must_use]
    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.dialect, self.schema.as_ref())
    }

    /// Compiles a query tree to SQL Server SQL.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Compile`] for trees that cannot be rendered.
    pub fn compile(&self, statement: &Statement) -> Result<CompiledQuery> {
        Ok(self.compiler().compile(statement)?)
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session<D::Connection>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the session unless an active one exists.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::ConnectionUnavailable`] when the driver
    /// cannot connect and [`AdapterError::UnsupportedServerVersion`] for
    /// servers older than SQL Server 2016.
    pub fn connect(&self) -> Result<()> {
        let mut session = self.lock_session();
        if session.as_ref().is_some_and(|s| s.connection.is_active()) {
            return Ok(());
        }
        *session = Some(self.open_session()?);
        Ok(())
    }

    /// Whether the session is open and usable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_session()
            .as_ref()
            .is_some_and(|s| s.connection.is_active())
    }

    /// Closes the session.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::ConnectionUnavailable`] when the driver
    /// reports a failure while closing.
    pub fn disconnect(&self) -> Result<()> {
        let Some(mut session) = self.lock_session().take() else {
            return Ok(());
        };
        info!(host = %self.config.host, "Disconnecting from SQL Server");
        session
            .connection
            .disconnect()
            .map_err(|error| AdapterError::ConnectionUnavailable(StatementError::from_driver(error)))
    }

    /// Closes the session, ignoring close errors, and opens a new one.
    ///
    /// # Errors
    ///
    /// Same as [`SqlServerAdapter::connect`].
    pub fn reconnect(&self) -> Result<()> {
        let mut session = self.lock_session();
        if let Some(mut old) = session.take() {
            if let Err(error) = old.connection.disconnect() {
                warn!(error = %error, "Failed to close previous session");
            }
        }
        *session = Some(self.open_session()?);
        Ok(())
    }

    /// Returns the session to a clean state: lock timeout, isolation level
    /// and open transactions go back to their configured defaults.
    ///
    /// # Errors
    ///
    /// Same as [`SqlServerAdapter::connect`].
    pub fn reset(&self) -> Result<()> {
        self.reconnect()
    }

    /// Version of the connected server.
    #[must_use]
    pub fn server_version(&self) -> Option<ServerVersion> {
        self.lock_session().as_ref().map(|s| s.version.clone())
    }

    fn open_session(&self) -> Result<Session<D::Connection>> {
        let url = self.config.connection_url();
        debug!(url = %url, "Opening SQL Server session");
        let mut connection = self
            .driver
            .connect(&url, &self.config.credentials())
            .map_err(|error| errors::connection_error(error, &self.config))?;
        match self.configure(&mut connection) {
            Ok(version) => {
                info!(
                    product = %version.product_name(),
                    version = %version.complete,
                    "Connected to SQL Server"
                );
                Ok(Session {
                    connection,
                    version,
                    collation: None,
                })
            }
            Err(error) => {
                if let Err(close_error) = connection.disconnect() {
                    warn!(error = %close_error, "Failed to close rejected session");
                }
                Err(error)
            }
        }
    }

    fn configure(&self, connection: &mut D::Connection) -> Result<ServerVersion> {
        let rows = run_query(&self.dialect, connection, VERSION_QUERY, &[])?;
        let version = ServerVersion::from_rows(&rows)
            .ok_or_else(|| AdapterError::Configuration(String::from("The server did not report its version")))?;
        if let Err(error) = version.check() {
            warn!(version = %version.complete, "{}", ServerVersion::support_message());
            return Err(error);
        }
        if let Some(level) = self.config.transaction_isolation {
            let sql = format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql());
            run_execute(&self.dialect, connection, &sql)?;
        }
        Ok(version)
    }

    /// Runs `f` on the session, opening it first when needed.
    fn with_session<T>(&self, f: impl FnOnce(&mut Session<D::Connection>) -> Result<T>) -> Result<T> {
        let mut guard = self.lock_session();
        if guard.is_none() {
            *guard = Some(self.open_session()?);
        }
        let session = guard.as_mut().ok_or_else(|| {
            AdapterError::ConnectionUnavailable(StatementError::new("No connection available"))
        })?;
        f(session)
    }

    fn with_connection<T>(&self, f: impl FnOnce(&mut D::Connection) -> Result<T>) -> Result<T> {
        self.with_session(|session| f(&mut session.connection))
    }

    /// Runs a query and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error.
    pub fn exec_query(&self, sql: &str, binds: &[SqlValue]) -> Result<RowSet> {
        self.with_connection(|connection| run_query(&self.dialect, connection, sql, binds))
    }

    /// Runs a statement and returns the update count.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error.
    pub fn execute(&self, sql: &str) -> Result<u64> {
        self.with_connection(|connection| run_execute(&self.dialect, connection, sql))
    }

    /// First column of the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error.
    pub fn select_value(&self, sql: &str, binds: &[SqlValue]) -> Result<Option<SqlValue>> {
        Ok(self.exec_query(sql, binds)?.first_value().cloned())
    }

    /// Name of the current database.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error.
    pub fn current_database(&self) -> Result<Option<String>> {
        Ok(self
            .select_value("SELECT DB_NAME()", &[])?
            .and_then(|value| value.as_text().map(String::from)))
    }

    /// Collation of the server, read once per session.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error.
    pub fn collation(&self) -> Result<Option<String>> {
        self.with_session(|session| {
            if session.collation.is_none() {
                let rows = run_query(&self.dialect, &mut session.connection, COLLATION_QUERY, &[])?;
                session.collation = rows.first_value().and_then(SqlValue::as_text).map(String::from);
            }
            Ok(session.collation.clone())
        })
    }

    /// `column = value`, made case-sensitive when the server collation
    /// would ignore case for this column.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error of the collation query.
    pub fn case_sensitive_comparison(&self, column: &ColumnMetadata, value: Expr) -> Result<Expr> {
        let collation = self.collation()?;
        Ok(comparison::case_sensitive_comparison(column, value, collation.as_deref()))
    }

    /// Compiles and runs a statement.
    ///
    /// INSERTs go through [`SqlServerAdapter::exec_insert`].
    ///
    /// # Errors
    ///
    /// Returns compile errors and translated driver errors.
    pub fn query(&self, statement: &Statement) -> Result<RowSet> {
        let compiled = self.compile(statement)?;
        match statement {
            Statement::Insert(_) => self.exec_insert(&compiled.sql, &compiled.binds),
            _ => self.exec_query(&compiled.sql, &compiled.binds),
        }
    }

    /// Compiles and runs an INSERT, returning the rows of its OUTPUT clause.
    ///
    /// # Errors
    ///
    /// Returns compile errors and translated driver errors.
    pub fn insert(&self, insert: InsertStatement) -> Result<RowSet> {
        self.query(&Statement::Insert(insert))
    }

    /// Runs an INSERT. When it names the identity column of its table the
    /// statement is wrapped in `SET IDENTITY_INSERT ... ON`/`OFF`; the
    /// override is switched off again whether or not the INSERT succeeds.
    ///
    /// # Errors
    ///
    /// Returns a `StatementInvalid` error when the identity override cannot
    /// be enabled, else the translated driver error.
    pub fn exec_insert(&self, sql: &str, binds: &[SqlValue]) -> Result<RowSet> {
        let identity_table = statements::identity_insert_table_name(sql, self.schema.as_ref());
        self.with_connection(|connection| {
            let Some(table) = identity_table else {
                return run_query(&self.dialect, connection, sql, binds);
            };
            debug!(table = %table, "Inserting explicit identity values");
            let mut scope = statements::enable_identity_insert(connection, &self.dialect, &table)?;
            let rows = run_query(&self.dialect, scope.connection(), sql, binds)?;
            scope.finish()?;
            Ok(rows)
        })
    }

    /// Empties a table. Tables referenced by a foreign key cannot be
    /// truncated; their rows are deleted instead.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error.
    pub fn truncate(&self, table: &str) -> Result<()> {
        self.with_connection(|connection| run_truncate(&self.dialect, connection, table))
    }

    /// Empties several tables with foreign key checks suspended.
    ///
    /// # Errors
    ///
    /// Returns the first translated driver error; constraint checks are
    /// restored either way.
    pub fn truncate_tables(&self, tables: &[&str]) -> Result<()> {
        if tables.is_empty() {
            return Ok(());
        }
        self.disable_referential_integrity(|connection| {
            tables
                .iter()
                .try_for_each(|table| run_truncate(&self.dialect, connection, table))
        })
    }

    /// Quoted `[schema].[table]` names of tables that declare foreign keys.
    ///
    /// # Errors
    ///
    /// Returns the translated driver error.
    pub fn tables_with_referential_integrity(&self) -> Result<Vec<String>> {
        self.with_connection(|connection| referencing_tables(&self.dialect, connection))
    }

    /// Runs `f` with every foreign key constraint unchecked
    /// (`NOCHECK CONSTRAINT ALL`). The constraints are checked again when
    /// `f` returns, whether or not it succeeds.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or a `StatementInvalid` error when the
    /// constraints cannot be switched off or back on.
    pub fn disable_referential_integrity<T>(
        &self,
        f: impl FnOnce(&mut D::Connection) -> Result<T>,
    ) -> Result<T> {
        self.with_connection(|connection| {
            let tables = referencing_tables(&self.dialect, connection)?;
            debug!(tables = tables.len(), "Suspending foreign key checks");
            let nocheck: Vec<String> = tables
                .iter()
                .map(|table| format!("ALTER TABLE {table} NOCHECK CONSTRAINT ALL"))
                .collect();
            let check = tables
                .iter()
                .map(|table| format!("ALTER TABLE {table} CHECK CONSTRAINT ALL"))
                .collect();
            let mut scope = SessionScope::enable_all(connection, "NOCHECK CONSTRAINT", "", &nocheck, check)?;
            let result = f(scope.connection())?;
            scope.finish()?;
            Ok(result)
        })
    }

    /// Execution plan of `sql` with `binds` inlined, as an ASCII table.
    ///
    /// # Errors
    ///
    /// Returns a `StatementInvalid` error when `SHOWPLAN_ALL` cannot be
    /// enabled, else the translated driver error.
    pub fn explain(&self, sql: &str, binds: &[SqlValue]) -> Result<String> {
        let sql = explain::interpolate(sql, binds, &self.dialect);
        let rows = self.with_connection(|connection| {
            let mut scope = SessionScope::enable(
                connection,
                "SHOWPLAN_ALL",
                " (check SHOWPLAN permissions)",
                SHOWPLAN_ON,
                SHOWPLAN_OFF,
            )?;
            let rows = run_query(&self.dialect, scope.connection(), &sql, &[])?;
            scope.finish()?;
            Ok(rows)
        })?;
        Ok(PrinterTable::new(&rows).pp())
    }

    /// Execution plan of a query tree.
    ///
    /// # Errors
    ///
    /// Same as [`SqlServerAdapter::explain`], plus compile errors.
    pub fn explain_statement(&self, statement: &Statement) -> Result<String> {
        let compiled = self.compile(statement)?;
        self.explain(&compiled.sql, &compiled.binds)
    }
}

fn run_truncate<C: RawConnection>(dialect: &SqlServerDialect, connection: &mut C, table: &str) -> Result<()> {
    let quoted = dialect.quote_table_name(table);
    match run_execute(dialect, connection, &format!("TRUNCATE TABLE {quoted}")) {
        Ok(_) => Ok(()),
        Err(error) if TRUNCATE_REFERENCED.is_match(&error.to_string()) => {
            debug!(table = %table, "Table is referenced by a foreign key, deleting rows instead");
            run_execute(dialect, connection, &format!("DELETE FROM {quoted}")).map(|_| ())
        }
        Err(error) => Err(error),
    }
}

fn referencing_tables<C: RawConnection>(dialect: &SqlServerDialect, connection: &mut C) -> Result<Vec<String>> {
    let rows = run_query(dialect, connection, REFERENCING_TABLES_QUERY, &[])?;
    let mut tables: Vec<String> = Vec::new();
    for row in &rows.rows {
        let (Some(schema), Some(table)) = (
            row.first().and_then(SqlValue::as_text),
            row.get(1).and_then(SqlValue::as_text),
        ) else {
            continue;
        };
        let name = format!("{}.{}", dialect.quote_identifier(schema), dialect.quote_identifier(table));
        if !tables.contains(&name) {
            tables.push(name);
        }
    }
    Ok(tables)
}

fn run_query<C: RawConnection>(
    dialect: &SqlServerDialect,
    connection: &mut C,
    sql: &str,
    binds: &[SqlValue],
) -> Result<RowSet> {
    debug!(sql = %sql, binds = binds.len(), "Executing query");
    let result = if binds.is_empty() {
        connection.execute_query(sql)
    } else {
        connection.execute_prepared(sql, binds)
    };
    result.map_err(|error| dialect.translate_error(error, Some(sql), binds))
}

fn run_execute<C: RawConnection>(dialect: &SqlServerDialect, connection: &mut C, sql: &str) -> Result<u64> {
    debug!(sql = %sql, "Executing statement");
    connection
        .execute(sql)
        .map_err(|error| dialect.translate_error(error, Some(sql), &[]))
}
