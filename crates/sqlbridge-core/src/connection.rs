//! Raw driver interface.
//!
//! Adapters never talk to a database directly: they hand SQL to a
//! [`RawConnection`] obtained from a [`Driver`]. All calls block.

use crate::value::SqlValue;

/// Error reported by the underlying driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    /// Native error message.
    pub message: String,
    /// Vendor error code.
    pub code: Option<i32>,
    /// SQLSTATE, when reported.
    pub sql_state: Option<String>,
}

impl DriverError {
    /// Creates an error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            sql_state: None,
        }
    }

    /// Sets the vendor error code.
    #[must_use]
    pub const fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the SQLSTATE.
    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column labels.
    pub columns: Vec<String>,
    /// Row values, one vector per row.
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    /// Creates a row set.
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    /// A row set without columns or rows.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row.
    #[must_use]
    pub fn first_value(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Position of `column` in the row layout.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Credentials handed to [`Driver::connect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
}

/// A single open database session.
pub trait RawConnection: Send {
    /// Runs a query without parameters.
    fn execute_query(&mut self, sql: &str) -> Result<RowSet, DriverError>;

    /// Runs a prepared statement with positional binds.
    fn execute_prepared(&mut self, sql: &str, binds: &[SqlValue]) -> Result<RowSet, DriverError>;

    /// Runs a statement and returns the update count.
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError>;

    /// Closes the session.
    fn disconnect(&mut self) -> Result<(), DriverError>;

    /// Whether the session is still usable.
    fn is_active(&self) -> bool;
}

/// Opens connections.
pub trait Driver: Send + Sync {
    /// Connection type produced by this driver.
    type Connection: RawConnection;

    /// Opens a session for `url`.
    fn connect(&self, url: &str, credentials: &Credentials) -> Result<Self::Connection, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_accessors() {
        let rows = RowSet::new(
            vec![String::from("ID"), String::from("name")],
            vec![vec![SqlValue::Int(1), SqlValue::Text(String::from("a"))]],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first_value(), Some(&SqlValue::Int(1)));
        assert_eq!(rows.column_index("id"), Some(0));
        assert!(RowSet::empty().is_empty());
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::new("boom").with_code(2627).with_sql_state("23000");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.code, Some(2627));
    }
}
