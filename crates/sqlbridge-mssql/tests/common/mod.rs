#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use sqlbridge_core::ast::Statement;
use sqlbridge_core::connection::{Credentials, Driver, DriverError, RawConnection, RowSet};
use sqlbridge_core::schema::{ColumnMetadata, MemorySchemaCache};
use sqlbridge_core::{CompiledQuery, Compiler, SqlValue};
use sqlbridge_mssql::version::VERSION_QUERY;
use sqlbridge_mssql::{ConnectionConfig, SqlServerAdapter, SqlServerDialect};

/// Schema with a single-key identity table, a composite-key table and a
/// table without a declared key.
pub fn schema() -> MemorySchemaCache {
    let cache = MemorySchemaCache::new();
    cache.add_table(
        "users",
        &["id"],
        vec![
            ColumnMetadata::new("id", "int identity").nullable(false),
            ColumnMetadata::new("name", "nvarchar(50)"),
            ColumnMetadata::new("active", "bit"),
        ],
    );
    cache.add_table(
        "memberships",
        &["group_id", "member_id"],
        vec![
            ColumnMetadata::new("group_id", "int").nullable(false),
            ColumnMetadata::new("member_id", "int identity").nullable(false),
        ],
    );
    cache.add_table(
        "events",
        &[],
        vec![
            ColumnMetadata::new("happened_at", "datetime2(7)"),
            ColumnMetadata::new("payload", "nvarchar(max)"),
        ],
    );
    cache
}

pub fn compile(statement: impl Into<Statement>) -> CompiledQuery {
    let dialect = SqlServerDialect::new();
    let schema = schema();
    let statement = statement.into();
    Compiler::new(&dialect, &schema)
        .compile(&statement)
        .unwrap_or_else(|e| panic!("Failed to compile: {statement:?}\nError: {e:?}"))
}

pub fn sql(statement: impl Into<Statement>) -> String {
    compile(statement).sql
}

/// Compiling the rewritten tree again must give the same SQL.
pub fn assert_stable(statement: impl Into<Statement>) {
    let first = compile(statement);
    let second = compile(first.statement.clone());
    assert_eq!(first.sql, second.sql, "Recompiling changed the SQL");
    assert_eq!(first.binds, second.binds, "Recompiling changed the binds");
}

// ===================================================================
// Recording driver
// ===================================================================

#[derive(Debug, Default)]
struct ScriptState {
    log: Vec<String>,
    binds: Vec<Vec<SqlValue>>,
    failures: Vec<(String, DriverError)>,
    results: Vec<(String, RowSet)>,
    connect_error: Option<DriverError>,
    connects: usize,
    urls: Vec<String>,
}

/// Shared script and log of a [`RecordingDriver`].
#[derive(Debug, Clone)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
    server_version: String,
}

impl Default for Script {
    fn default() -> Self {
        Self::new("16.0.1000.6")
    }
}

impl Script {
    pub fn new(server_version: &str) -> Self {
        Self {
            state: Arc::default(),
            server_version: server_version.to_string(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Statements containing `needle` fail with `message`.
    pub fn fail_on(&self, needle: &str, message: &str) {
        self.state()
            .failures
            .push((needle.to_string(), DriverError::new(message)));
    }

    /// Queries containing `needle` return `rows`.
    pub fn respond(&self, needle: &str, rows: RowSet) {
        self.state().results.push((needle.to_string(), rows));
    }

    pub fn fail_connect(&self, message: &str) {
        self.state().connect_error = Some(DriverError::new(message));
    }

    /// Executed statements, without the version query.
    pub fn log(&self) -> Vec<String> {
        self.state()
            .log
            .iter()
            .filter(|sql| sql.as_str() != VERSION_QUERY)
            .cloned()
            .collect()
    }

    pub fn binds(&self) -> Vec<Vec<SqlValue>> {
        self.state().binds.clone()
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn urls(&self) -> Vec<String> {
        self.state().urls.clone()
    }

    fn run(&self, sql: &str, binds: &[SqlValue]) -> Result<RowSet, DriverError> {
        let mut state = self.state();
        state.log.push(sql.to_string());
        state.binds.push(binds.to_vec());
        if let Some((_, error)) = state.failures.iter().find(|(needle, _)| sql.contains(needle.as_str())) {
            return Err(error.clone());
        }
        if sql == VERSION_QUERY {
            let major = self.server_version.split('.').next().unwrap_or_default().to_string();
            return Ok(RowSet::new(
                vec![
                    String::from("version"),
                    String::from("major"),
                    String::from("level"),
                    String::from("edition"),
                ],
                vec![vec![
                    SqlValue::Text(self.server_version.clone()),
                    SqlValue::Text(major),
                    SqlValue::Text(String::from("RTM")),
                    SqlValue::Text(String::from("Developer Edition (64-bit)")),
                ]],
            ));
        }
        Ok(state
            .results
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    pub script: Script,
}

#[derive(Debug)]
pub struct RecordingConnection {
    script: Script,
    open: bool,
}

impl RawConnection for RecordingConnection {
    fn execute_query(&mut self, sql: &str) -> Result<RowSet, DriverError> {
        self.script.run(sql, &[])
    }

    fn execute_prepared(&mut self, sql: &str, binds: &[SqlValue]) -> Result<RowSet, DriverError> {
        self.script.run(sql, binds)
    }

    fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        self.script.run(sql, &[]).map(|rows| rows.len() as u64)
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        self.open = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.open
    }
}

impl Driver for RecordingDriver {
    type Connection = RecordingConnection;

    fn connect(&self, url: &str, _credentials: &Credentials) -> Result<RecordingConnection, DriverError> {
        let mut state = self.script.state();
        state.urls.push(url.to_string());
        if let Some(error) = state.connect_error.clone() {
            return Err(error);
        }
        state.connects += 1;
        drop(state);
        Ok(RecordingConnection {
            script: self.script.clone(),
            open: true,
        })
    }
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig {
        database: Some(String::from("shop")),
        username: Some(String::from("sa")),
        password: Some(String::from("secret")),
        ..ConnectionConfig::default()
    }
}

pub fn adapter_with(script: &Script, config: ConnectionConfig) -> SqlServerAdapter<RecordingDriver> {
    SqlServerAdapter::new(
        RecordingDriver {
            script: script.clone(),
        },
        config,
        Arc::new(schema()),
    )
}

pub fn adapter(script: &Script) -> SqlServerAdapter<RecordingDriver> {
    adapter_with(script, config())
}
