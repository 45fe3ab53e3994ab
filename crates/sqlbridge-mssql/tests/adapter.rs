//! Adapter behaviour against a recording driver.

mod common;
use common::*;

use std::error::Error as _;

use sqlbridge_core::ast::{Expr, InsertStatement, SelectStatement, TableRef};
use sqlbridge_core::connection::RowSet;
use sqlbridge_core::schema::ColumnMetadata;
use sqlbridge_core::{AdapterError, ErrorKind, SqlValue};
use sqlbridge_mssql::{ConnectionConfig, IsolationLevel};

// ===================================================================
// Connecting
// ===================================================================

#[test]
fn connect_checks_version_and_configures_session() {
    let script = Script::default();
    let config = ConnectionConfig {
        transaction_isolation: Some(IsolationLevel::Snapshot),
        ..config()
    };
    let adapter = adapter_with(&script, config);
    adapter.connect().unwrap();

    assert!(adapter.is_active());
    assert_eq!(script.log(), vec!["SET TRANSACTION ISOLATION LEVEL SNAPSHOT"]);
    let version = adapter.server_version().unwrap();
    assert_eq!(version.major, Some(16));
    assert_eq!(version.product_name(), "Microsoft SQL Server 2022");
    assert_eq!(
        script.urls(),
        vec!["jdbc:sqlserver://localhost;databaseName=shop;sendTimeAsDatetime=false;lockTimeout=5000;"]
    );

    // an active session is reused
    adapter.connect().unwrap();
    assert_eq!(script.connects(), 1);
}

#[test]
fn old_servers_are_rejected() {
    let script = Script::new("12.0.6024.0");
    let adapter = adapter(&script);
    let err = adapter.connect().unwrap_err();
    assert!(matches!(
        err,
        AdapterError::UnsupportedServerVersion { ref detected, .. } if detected == "12.0.6024.0"
    ));
    assert_eq!(err.kind(), None);
    assert!(!adapter.is_active());
}

#[test]
fn connection_failures_are_classified() {
    let script = Script::default();
    script.fail_connect("Login failed for user 'sa'.");
    let err = adapter(&script).connect().unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ConnectionUnavailable));
    assert!(err.to_string().starts_with("Access denied for user sa"));
    assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("Login failed for user 'sa'."));
}

#[test]
fn reset_opens_a_fresh_session() {
    let script = Script::default();
    let adapter = adapter(&script);
    adapter.connect().unwrap();
    adapter.reset().unwrap();
    assert_eq!(script.connects(), 2);
    assert!(adapter.is_active());

    adapter.disconnect().unwrap();
    assert!(!adapter.is_active());
    assert!(adapter.server_version().is_none());
}

#[test]
fn queries_connect_lazily() {
    let script = Script::default();
    script.respond(
        "DB_NAME()",
        RowSet::new(vec![String::new()], vec![vec![SqlValue::Text(String::from("shop"))]]),
    );
    let adapter = adapter(&script);
    assert_eq!(adapter.current_database().unwrap().as_deref(), Some("shop"));
    assert_eq!(script.connects(), 1);
}

// ===================================================================
// Statements
// ===================================================================

#[test]
fn compiled_select_runs_with_binds() {
    let script = Script::default();
    let adapter = adapter(&script);
    let select = SelectStatement::from_table(TableRef::table("users"))
        .column(Expr::column("name"))
        .filter(Expr::column("id").eq(Expr::bind(3i64)))
        .limit(Expr::integer(1));
    adapter.query(&select.into()).unwrap();
    assert_eq!(
        script.log(),
        vec!["SELECT [name] FROM [users] WHERE [id] = ? ORDER BY [users].[id] ASC OFFSET 0 ROWS FETCH NEXT 1 ROWS ONLY"]
    );
    assert_eq!(script.binds().last(), Some(&vec![SqlValue::Int(3)]));
}

#[test]
fn duplicate_key_is_a_uniqueness_violation() {
    let script = Script::default();
    let message = "Violation of PRIMARY KEY constraint 'PK_users'. Cannot insert duplicate key in object \
                   'dbo.users'. The duplicate key value is (1).";
    script.fail_on("INSERT", message);
    let adapter = adapter(&script);

    let err = adapter
        .exec_insert("INSERT INTO [users] ([name]) VALUES (?)", &[SqlValue::Text(String::from("ada"))])
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::UniquenessViolation));
    let statement = err.statement().unwrap();
    assert_eq!(statement.sql.as_deref(), Some("INSERT INTO [users] ([name]) VALUES (?)"));
    assert_eq!(statement.binds.len(), 1);
    assert_eq!(err.source().map(ToString::to_string).as_deref(), Some(message));
}

#[test]
fn truncate_falls_back_to_delete() {
    let script = Script::default();
    script.fail_on(
        "TRUNCATE",
        "Cannot truncate table 'users' because it is being referenced by a FOREIGN KEY constraint.",
    );
    let adapter = adapter(&script);
    adapter.truncate("users").unwrap();
    assert_eq!(script.log(), vec!["TRUNCATE TABLE [users]", "DELETE FROM [users]"]);
}

#[test]
fn truncate_reports_other_failures() {
    let script = Script::default();
    script.fail_on("TRUNCATE", "Cannot find the object \"nope\" because it does not exist.");
    let err = adapter(&script).truncate("nope").unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::StatementInvalid));
    assert_eq!(script.log(), vec!["TRUNCATE TABLE [nope]"]);
}

fn referencing_tables() -> RowSet {
    let row = |schema: &str, table: &str| {
        vec![SqlValue::Text(schema.to_string()), SqlValue::Text(table.to_string())]
    };
    RowSet::new(
        vec![String::from("name"), String::from("name")],
        vec![row("dbo", "memberships"), row("dbo", "memberships"), row("sales", "orders")],
    )
}

#[test]
fn truncate_tables_suspends_foreign_keys() {
    let script = Script::default();
    script.respond("sys.foreign_keys", referencing_tables());
    let adapter = adapter(&script);
    adapter.truncate_tables(&["users", "events"]).unwrap();
    assert_eq!(
        script.log()[1..],
        [
            "ALTER TABLE [dbo].[memberships] NOCHECK CONSTRAINT ALL",
            "ALTER TABLE [sales].[orders] NOCHECK CONSTRAINT ALL",
            "TRUNCATE TABLE [users]",
            "TRUNCATE TABLE [events]",
            "ALTER TABLE [dbo].[memberships] CHECK CONSTRAINT ALL",
            "ALTER TABLE [sales].[orders] CHECK CONSTRAINT ALL",
        ]
    );
}

#[test]
fn constraint_checks_return_after_failed_truncate() {
    let script = Script::default();
    script.respond("sys.foreign_keys", referencing_tables());
    script.fail_on("TRUNCATE TABLE [events]", "The user does not have permission to perform this action.");
    let adapter = adapter(&script);
    let err = adapter.truncate_tables(&["users", "events", "memberships"]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::StatementInvalid));
    assert_eq!(
        script.log()[1..],
        [
            "ALTER TABLE [dbo].[memberships] NOCHECK CONSTRAINT ALL",
            "ALTER TABLE [sales].[orders] NOCHECK CONSTRAINT ALL",
            "TRUNCATE TABLE [users]",
            "TRUNCATE TABLE [events]",
            "ALTER TABLE [dbo].[memberships] CHECK CONSTRAINT ALL",
            "ALTER TABLE [sales].[orders] CHECK CONSTRAINT ALL",
        ]
    );
}

#[test]
fn constraint_checks_return_after_failed_nocheck() {
    let script = Script::default();
    script.respond("sys.foreign_keys", referencing_tables());
    script.fail_on("[sales].[orders] NOCHECK", "Cannot find the object \"orders\".");
    let adapter = adapter(&script);
    let err = adapter.truncate_tables(&["users"]).unwrap_err();
    assert!(err
        .to_string()
        .starts_with("NOCHECK CONSTRAINT could not be turned ON due : "));
    assert_eq!(
        script.log()[1..],
        [
            "ALTER TABLE [dbo].[memberships] NOCHECK CONSTRAINT ALL",
            "ALTER TABLE [sales].[orders] NOCHECK CONSTRAINT ALL",
            "ALTER TABLE [dbo].[memberships] CHECK CONSTRAINT ALL",
            "ALTER TABLE [sales].[orders] CHECK CONSTRAINT ALL",
        ]
    );
}

#[test]
fn truncating_nothing_runs_nothing() {
    let script = Script::default();
    adapter(&script).truncate_tables(&[]).unwrap();
    assert!(script.log().is_empty());
    assert_eq!(script.connects(), 0);
}

// ===================================================================
// Collation
// ===================================================================

fn collation(name: &str) -> RowSet {
    RowSet::new(
        vec![String::from("Collation")],
        vec![vec![SqlValue::Text(name.to_string())]],
    )
}

#[test]
fn collation_is_read_once_per_session() {
    let script = Script::default();
    script.respond("SERVERPROPERTY('Collation')", collation("SQL_Latin1_General_CP1_CI_AS"));
    let adapter = adapter(&script);
    assert_eq!(adapter.collation().unwrap().as_deref(), Some("SQL_Latin1_General_CP1_CI_AS"));
    assert_eq!(adapter.collation().unwrap().as_deref(), Some("SQL_Latin1_General_CP1_CI_AS"));
    assert_eq!(script.log().len(), 1);
}

#[test]
fn insensitive_server_compares_with_binary_collation() {
    let script = Script::default();
    script.respond("SERVERPROPERTY('Collation')", collation("SQL_Latin1_General_CP1_CI_AS"));
    let adapter = adapter(&script);
    let name = ColumnMetadata::new("name", "nvarchar(50)").table("users");
    let predicate = adapter.case_sensitive_comparison(&name, Expr::bind("Bob")).unwrap();
    let select = SelectStatement::from_table(TableRef::table("users"))
        .column(Expr::column("id"))
        .filter(predicate);
    assert_eq!(
        adapter.compile(&select.into()).unwrap().sql,
        "SELECT [id] FROM [users] WHERE [users].[name] = ? COLLATE Latin1_General_CS_AS_WS"
    );
}

#[test]
fn sensitive_server_compares_plainly() {
    let script = Script::default();
    script.respond("SERVERPROPERTY('Collation')", collation("Latin1_General_CS_AS"));
    let adapter = adapter(&script);
    let name = ColumnMetadata::new("name", "nvarchar(50)");
    let predicate = adapter.case_sensitive_comparison(&name, Expr::bind("Bob")).unwrap();
    assert_eq!(predicate, Expr::column("name").eq(Expr::bind("Bob")));
}

// ===================================================================
// Identity inserts
// ===================================================================

#[test]
fn explicit_identity_is_wrapped() {
    let script = Script::default();
    let adapter = adapter(&script);
    let insert = InsertStatement::into_table("users", &["id", "name"])
        .row(vec![Expr::bind(7i64), Expr::bind("ada")])
        .returning(&["id"]);
    adapter.insert(insert).unwrap();
    assert_eq!(
        script.log(),
        vec![
            "SET IDENTITY_INSERT [users] ON",
            "INSERT INTO [users] ([id], [name]) OUTPUT INSERTED.[id] VALUES (?, ?)",
            "SET IDENTITY_INSERT [users] OFF",
        ]
    );
}

#[test]
fn identity_override_is_disabled_after_failure() {
    let script = Script::default();
    script.fail_on("INSERT INTO", "Cannot insert the value NULL into column 'name', table 'shop.dbo.users'; column does not allow nulls.");
    let adapter = adapter(&script);
    let err = adapter
        .exec_insert("INSERT INTO [users] ([id], [name]) VALUES (?, ?)", &[SqlValue::Int(1), SqlValue::Null])
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotNullViolation));
    assert_eq!(
        script.log(),
        vec![
            "SET IDENTITY_INSERT [users] ON",
            "INSERT INTO [users] ([id], [name]) VALUES (?, ?)",
            "SET IDENTITY_INSERT [users] OFF",
        ]
    );
}

#[test]
fn identity_override_failure_is_reported() {
    let script = Script::default();
    script.fail_on("IDENTITY_INSERT [users] ON", "Cannot find the object \"users\".");
    let adapter = adapter(&script);
    let err = adapter
        .exec_insert("INSERT INTO [users] ([id]) VALUES (?)", &[SqlValue::Int(1)])
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::StatementInvalid));
    assert_eq!(
        err.to_string(),
        "IDENTITY_INSERT could not be turned ON for table [users] due : Cannot find the object \"users\"."
    );
    assert_eq!(
        script.log(),
        vec!["SET IDENTITY_INSERT [users] ON", "SET IDENTITY_INSERT [users] OFF"]
    );
}

#[test]
fn insert_without_identity_is_not_wrapped() {
    let script = Script::default();
    let adapter = adapter(&script);
    adapter
        .exec_insert("INSERT INTO [users] ([name]) VALUES (?)", &[SqlValue::Text(String::from("x"))])
        .unwrap();
    assert_eq!(script.log(), vec!["INSERT INTO [users] ([name]) VALUES (?)"]);
}

// ===================================================================
// EXPLAIN
// ===================================================================

#[test]
fn explain_toggles_showplan_and_inlines_binds() {
    let script = Script::default();
    script.respond(
        "FROM [users]",
        RowSet::new(
            vec![String::from("StmtText")],
            vec![vec![SqlValue::Text(String::from("Clustered Index Seek"))]],
        ),
    );
    let adapter = adapter(&script);
    let plan = adapter
        .explain("SELECT [name] FROM [users] WHERE [id] = ?", &[SqlValue::Int(5)])
        .unwrap();
    assert_eq!(
        script.log(),
        vec![
            "SET SHOWPLAN_ALL ON",
            "SELECT [name] FROM [users] WHERE [id] = 5",
            "SET SHOWPLAN_ALL OFF",
        ]
    );
    assert!(plan.contains("| Clustered Index Seek |"));
    assert!(plan.ends_with("1 row in set"));
}

#[test]
fn explain_without_permission() {
    let script = Script::default();
    script.fail_on("SHOWPLAN_ALL ON", "SHOWPLAN permission denied in database 'shop'.");
    let err = adapter(&script).explain("SELECT 1", &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "SHOWPLAN_ALL could not be turned ON (check SHOWPLAN permissions) due : \
         SHOWPLAN permission denied in database 'shop'."
    );
    assert_eq!(script.log(), vec!["SET SHOWPLAN_ALL ON", "SET SHOWPLAN_ALL OFF"]);
}
