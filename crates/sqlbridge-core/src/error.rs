//! Error types for adapters and the compiler.

use std::fmt;

use crate::connection::DriverError;
use crate::value::SqlValue;

/// Errors raised while compiling a query tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A limited, offset or ordered UPDATE/DELETE has no key column to
    /// restrict the affected rows with.
    #[error("{statement} with LIMIT, OFFSET or ORDER BY requires a key column")]
    UnkeyedRowLimit {
        /// `UPDATE` or `DELETE`.
        statement: &'static str,
    },

    /// The tree cannot be rendered.
    #[error("Invalid query tree: {0}")]
    InvalidTree(String),
}

/// Kind of a translated database error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection is gone or could not be established.
    ConnectionUnavailable,
    /// Unique index or primary key violation.
    UniquenessViolation,
    /// NULL written to a NOT NULL column.
    NotNullViolation,
    /// Foreign key violation.
    ForeignKeyViolation,
    /// Value longer than the column allows.
    ValueTooLong,
    /// Numeric value out of range.
    NumericOverflow,
    /// Lock wait timed out.
    LockTimeout,
    /// Anything else the database rejected.
    StatementInvalid,
}

impl ErrorKind {
    /// Human readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionUnavailable => "connection unavailable",
            Self::UniquenessViolation => "uniqueness violation",
            Self::NotNullViolation => "not-null violation",
            Self::ForeignKeyViolation => "foreign key violation",
            Self::ValueTooLong => "value too long",
            Self::NumericOverflow => "numeric overflow",
            Self::LockTimeout => "lock timeout",
            Self::StatementInvalid => "statement invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context of a failed statement.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct StatementError {
    /// Message shown to the caller.
    pub message: String,
    /// The SQL that failed, if known.
    pub sql: Option<String>,
    /// Bind values of the failed statement.
    pub binds: Vec<SqlValue>,
    /// The driver error this was translated from.
    #[source]
    pub cause: Option<DriverError>,
}

impl StatementError {
    /// Creates a context with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql: None,
            binds: Vec::new(),
            cause: None,
        }
    }

    /// Wraps a driver error, reusing its message.
    #[must_use]
    pub fn from_driver(cause: DriverError) -> Self {
        Self {
            message: cause.message.clone(),
            sql: None,
            binds: Vec::new(),
            cause: Some(cause),
        }
    }

    /// Attaches the failed SQL.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Attaches the bind values.
    #[must_use]
    pub fn with_binds(mut self, binds: &[SqlValue]) -> Self {
        self.binds = binds.to_vec();
        self
    }

    /// Attaches the driver error.
    #[must_use]
    pub fn with_cause(mut self, cause: DriverError) -> Self {
        self.cause = Some(cause);
        self
    }
}

/// Errors surfaced by adapters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    /// No usable connection.
    #[error(transparent)]
    ConnectionUnavailable(StatementError),

    /// Unique index or primary key violation.
    #[error(transparent)]
    UniquenessViolation(StatementError),

    /// NULL written to a NOT NULL column.
    #[error(transparent)]
    NotNullViolation(StatementError),

    /// Foreign key violation.
    #[error(transparent)]
    ForeignKeyViolation(StatementError),

    /// Value longer than the column allows.
    #[error(transparent)]
    ValueTooLong(StatementError),

    /// Numeric value out of range.
    #[error(transparent)]
    NumericOverflow(StatementError),

    /// Lock wait timed out.
    #[error(transparent)]
    LockTimeout(StatementError),

    /// The database rejected the statement.
    #[error(transparent)]
    StatementInvalid(StatementError),

    /// The server is older than the minimum supported version. Not retryable.
    #[error("{product} {detected} is not supported, the minimum supported version is {minimum}")]
    UnsupportedServerVersion {
        /// Product name reported by the server.
        product: String,
        /// Detected version.
        detected: String,
        /// Minimum supported version.
        minimum: String,
    },

    /// An argument is outside the accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The adapter configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The query tree could not be compiled.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),
}

impl AdapterError {
    /// Builds the error variant for `kind`.
    #[must_use]
    pub const fn from_kind(kind: ErrorKind, error: StatementError) -> Self {
        match kind {
            ErrorKind::ConnectionUnavailable => Self::ConnectionUnavailable(error),
            ErrorKind::UniquenessViolation => Self::UniquenessViolation(error),
            ErrorKind::NotNullViolation => Self::NotNullViolation(error),
            ErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(error),
            ErrorKind::ValueTooLong => Self::ValueTooLong(error),
            ErrorKind::NumericOverflow => Self::NumericOverflow(error),
            ErrorKind::LockTimeout => Self::LockTimeout(error),
            ErrorKind::StatementInvalid => Self::StatementInvalid(error),
        }
    }

    /// Kind of a translated database error.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::ConnectionUnavailable(_) => Some(ErrorKind::ConnectionUnavailable),
            Self::UniquenessViolation(_) => Some(ErrorKind::UniquenessViolation),
            Self::NotNullViolation(_) => Some(ErrorKind::NotNullViolation),
            Self::ForeignKeyViolation(_) => Some(ErrorKind::ForeignKeyViolation),
            Self::ValueTooLong(_) => Some(ErrorKind::ValueTooLong),
            Self::NumericOverflow(_) => Some(ErrorKind::NumericOverflow),
            Self::LockTimeout(_) => Some(ErrorKind::LockTimeout),
            Self::StatementInvalid(_) => Some(ErrorKind::StatementInvalid),
            Self::UnsupportedServerVersion { .. }
            | Self::InvalidArgument(_)
            | Self::Configuration(_)
            | Self::Compile(_) => None,
        }
    }

    /// Statement context of a translated database error.
    #[must_use]
    pub const fn statement(&self) -> Option<&StatementError> {
        match self {
            Self::ConnectionUnavailable(e)
            | Self::UniquenessViolation(e)
            | Self::NotNullViolation(e)
            | Self::ForeignKeyViolation(e)
            | Self::ValueTooLong(e)
            | Self::NumericOverflow(e)
            | Self::LockTimeout(e)
            | Self::StatementInvalid(e) => Some(e),
            Self::UnsupportedServerVersion { .. }
            | Self::InvalidArgument(_)
            | Self::Configuration(_)
            | Self::Compile(_) => None,
        }
    }

    /// Shorthand for a [`AdapterError::StatementInvalid`] with a message.
    #[must_use]
    pub fn statement_invalid(message: impl Into<String>) -> Self {
        Self::StatementInvalid(StatementError::new(message))
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_kind_round_trip() {
        let err = AdapterError::from_kind(
            ErrorKind::LockTimeout,
            StatementError::new("Lock request time out period exceeded."),
        );
        assert_eq!(err.kind(), Some(ErrorKind::LockTimeout));
        assert_eq!(err.to_string(), "Lock request time out period exceeded.");
    }

    #[test]
    fn test_cause_is_source() {
        let cause = DriverError::new("Violation of PRIMARY KEY constraint");
        let err = AdapterError::UniquenessViolation(
            StatementError::from_driver(cause.clone()).with_sql("INSERT INTO t VALUES (1)"),
        );
        let source = err.source().expect("driver error attached");
        assert_eq!(source.to_string(), cause.message);
        assert_eq!(
            err.statement().and_then(|s| s.sql.as_deref()),
            Some("INSERT INTO t VALUES (1)")
        );
    }

    #[test]
    fn test_version_message() {
        let err = AdapterError::UnsupportedServerVersion {
            product: String::from("Microsoft SQL Server 2014"),
            detected: String::from("12.0.2000.8"),
            minimum: String::from("13"),
        };
        assert!(err.to_string().contains("minimum supported version is 13"));
        assert_eq!(err.kind(), None);
    }
}
