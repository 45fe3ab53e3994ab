//! Statement helpers for inserts: identity overrides, `OUTPUT INSERTED`
//! and bind ordering.

use std::sync::LazyLock;

use regex::Regex;
use sqlbridge_core::connection::RawConnection;
use sqlbridge_core::dialect::Dialect;
use sqlbridge_core::error::Result;
use sqlbridge_core::schema::SchemaCache;
use sqlbridge_core::value::SqlValue;
use tracing::debug;

use crate::scope::SessionScope;
use crate::utils;

fn re(source: &str) -> Regex {
    Regex::new(source).expect("statement patterns are valid")
}

static INSERT_COLUMNS: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)INSERT INTO [^ ]+ ?\((.+?)\)"));
static COLUMN_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| re(r", *"));
static INSERT_HEAD: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)^(\s*INSERT\s+(?:INTO\s+)?[^\(\s]+\s*(?:\([^)]*\))?)\s*(.*)$"));

/// Scope holding `SET IDENTITY_INSERT <table> ON`.
pub type IdentityInsertScope<'c, C> = SessionScope<'c, C>;

/// Table whose identity column is explicitly given in an INSERT.
///
/// Returns `None` when `sql` is not an INSERT, the table has no identity
/// column, or the column list leaves the identity out.
#[must_use]
pub fn identity_insert_table_name(sql: &str, schema: &dyn SchemaCache) -> Option<String> {
    if !utils::is_insert_sql(sql) {
        return None;
    }
    let table = utils::get_table_name(sql, true)?;
    let identity = schema.identity_column(&utils::unqualify_table_name(&table))?;
    let columns = INSERT_COLUMNS.captures(sql)?;
    let names_identity = COLUMN_SEPARATOR
        .split(columns[1].trim())
        .map(utils::unquote_identifier)
        .any(|column| column == identity.name);
    names_identity.then_some(table)
}

/// Statements switching the identity override for `table` on and off.
#[must_use]
pub fn identity_insert_statements(dialect: &dyn Dialect, table: &str) -> (String, String) {
    let quoted = dialect.quote_table_name(table);
    (
        format!("SET IDENTITY_INSERT {quoted} ON"),
        format!("SET IDENTITY_INSERT {quoted} OFF"),
    )
}

/// Enables explicit identity values for `table` until the scope ends.
///
/// # Errors
///
/// Returns a `StatementInvalid` error naming the table when the override
/// cannot be enabled; the disabling statement is still attempted.
pub fn enable_identity_insert<'c, C: RawConnection>(
    connection: &'c mut C,
    dialect: &dyn Dialect,
    table: &str,
) -> Result<IdentityInsertScope<'c, C>> {
    let (on, off) = identity_insert_statements(dialect, table);
    SessionScope::enable(connection, "IDENTITY_INSERT", &format!(" for table {table}"), &on, &off)
}

/// Adds `OUTPUT INSERTED.<col>, ...` after the column list of an INSERT.
///
/// The statement is returned unchanged when there is nothing to return,
/// it already has an OUTPUT clause, or it is not an INSERT.
#[must_use]
pub fn insert_with_output(sql: &str, columns: &[&str], dialect: &dyn Dialect) -> String {
    if columns.is_empty() || sql.to_ascii_uppercase().contains(" OUTPUT ") {
        return sql.to_string();
    }
    let Some(caps) = INSERT_HEAD.captures(sql) else {
        return sql.to_string();
    };
    let output = columns
        .iter()
        .map(|column| format!("INSERTED.{}", dialect.quote_column_name(column)))
        .collect::<Vec<_>>()
        .join(", ");
    debug!(columns = %output, "Adding OUTPUT clause to INSERT");
    format!("{} OUTPUT {output} {}", caps[1].trim_end(), &caps[2])
}

/// Bind values of one SELECT, grouped by the clause they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseBinds {
    /// Binds inside the FROM clause (derived tables).
    pub from: Vec<SqlValue>,
    /// Binds inside JOIN clauses.
    pub join: Vec<SqlValue>,
    /// Binds of the WHERE clause.
    pub wheres: Vec<SqlValue>,
    /// Binds of the HAVING clause.
    pub having: Vec<SqlValue>,
    /// The limit, when bound.
    pub limit: Option<SqlValue>,
    /// The offset, when bound.
    pub offset: Option<SqlValue>,
}

/// Orders clause binds the way placeholders appear in SQL Server text:
/// FROM, JOIN, WHERE, HAVING, then OFFSET before LIMIT.
#[must_use]
pub fn combine_bind_parameters(binds: ClauseBinds) -> Vec<SqlValue> {
    let ClauseBinds {
        from,
        join,
        wheres,
        having,
        limit,
        offset,
    } = binds;
    from.into_iter()
        .chain(join)
        .chain(wheres)
        .chain(having)
        .chain(offset)
        .chain(limit)
        .collect()
}
