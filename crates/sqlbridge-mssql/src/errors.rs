//! SQL Server error translation.
//!
//! The JDBC driver reports most constraint failures without a usable
//! SQLSTATE, so the rules below match on the native message text.

use std::sync::LazyLock;

use regex::Regex;
use sqlbridge_core::connection::DriverError;
use sqlbridge_core::error::{AdapterError, ErrorKind, StatementError};
use sqlbridge_core::translate::ErrorTranslator;

use crate::config::ConnectionConfig;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("error translation patterns are valid")
}

/// Message rules, checked in order before the SQLSTATE classes.
fn translator() -> ErrorTranslator {
    ErrorTranslator::new()
        .message(pattern(r"(?i)no connection available"), ErrorKind::ConnectionUnavailable)
        .message(
            pattern(r"(?i)cannot insert duplicate key .* with unique index|violation of unique key constraint"),
            ErrorKind::UniquenessViolation,
        )
        .message(
            pattern(
                r"(?is)Violation of PRIMARY KEY constraint .* Cannot insert duplicate key in object .* The duplicate key value is",
            ),
            ErrorKind::UniquenessViolation,
        )
        .message(pattern(r"(?i)Lock request time out period exceeded"), ErrorKind::LockTimeout)
        .message(
            pattern(r"The .* statement conflicted with the FOREIGN KEY constraint"),
            ErrorKind::ForeignKeyViolation,
        )
        .message(
            pattern(r"Could not drop object .* because it is referenced by a FOREIGN KEY constraint"),
            ErrorKind::StatementInvalid,
        )
        .message(
            pattern(r"The .* statement conflicted with the REFERENCE constraint"),
            ErrorKind::ForeignKeyViolation,
        )
        .message(pattern(r"(?i)String or binary data would be truncated"), ErrorKind::ValueTooLong)
        .message(
            pattern(r"Cannot insert the value NULL into column .* does not allow nulls"),
            ErrorKind::NotNullViolation,
        )
        .message(
            pattern(r"Arithmetic overflow error converting expression"),
            ErrorKind::NumericOverflow,
        )
        .message(
            pattern(r"Snapshot isolation transaction aborted due to update conflict"),
            ErrorKind::StatementInvalid,
        )
        .message(pattern(r"Incorrect syntax near the keyword"), ErrorKind::StatementInvalid)
        .message(pattern(r"Could not find stored procedure"), ErrorKind::StatementInvalid)
        .sql_state_rules()
        .message(pattern(r"(?i)cannot insert duplicate key"), ErrorKind::UniquenessViolation)
}

/// Rules used by [`crate::SqlServerDialect`].
pub static TRANSLATOR: LazyLock<ErrorTranslator> = LazyLock::new(translator);

/// Classifies a failure to open a session.
///
/// The driver message is inspected for the configured database, user and
/// host so that the error names what is wrong.
#[must_use]
pub fn connection_error(error: DriverError, config: &ConnectionConfig) -> AdapterError {
    let message = &error.message;
    let targeted = if let Some(database) = config.database.as_deref().filter(|db| message.contains(db)) {
        format!("We could not find your database: {database}. Available database configurations can be found in the connection settings")
    } else if let Some(username) = config.username.as_deref().filter(|user| message.contains(user)) {
        format!("Access denied for user {username}. Please check your username and password")
    } else if message.contains(config.host.as_str()) {
        format!("There is an issue connecting with your hostname: {}", config.host)
    } else {
        message.clone()
    };
    AdapterError::ConnectionUnavailable(StatementError::new(targeted).with_cause(error))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> ErrorKind {
        TRANSLATOR.classify(&DriverError::new(message))
    }

    #[test]
    fn test_constraint_messages() {
        assert_eq!(
            classify("Cannot insert duplicate key row in object 'dbo.users' with unique index 'ix_email'."),
            ErrorKind::UniquenessViolation
        );
        assert_eq!(
            classify(
                "Violation of PRIMARY KEY constraint 'PK_users'. Cannot insert duplicate key in object \
                 'dbo.users'. The duplicate key value is (1)."
            ),
            ErrorKind::UniquenessViolation
        );
        assert_eq!(
            classify("The INSERT statement conflicted with the FOREIGN KEY constraint \"FK_posts_users\"."),
            ErrorKind::ForeignKeyViolation
        );
        assert_eq!(
            classify("The DELETE statement conflicted with the REFERENCE constraint \"FK_posts_users\"."),
            ErrorKind::ForeignKeyViolation
        );
        assert_eq!(
            classify("Cannot insert the value NULL into column 'name', table 'db.dbo.users'; column does not allow nulls."),
            ErrorKind::NotNullViolation
        );
    }

    #[test]
    fn test_value_and_lock_messages() {
        assert_eq!(
            classify("String or binary data would be truncated."),
            ErrorKind::ValueTooLong
        );
        assert_eq!(
            classify("Arithmetic overflow error converting expression to data type int."),
            ErrorKind::NumericOverflow
        );
        assert_eq!(
            classify("Lock request time out period exceeded."),
            ErrorKind::LockTimeout
        );
        assert_eq!(
            classify("Could not drop object 'users' because it is referenced by a FOREIGN KEY constraint."),
            ErrorKind::StatementInvalid
        );
        assert_eq!(classify("Invalid object name 'nope'."), ErrorKind::StatementInvalid);
    }

    #[test]
    fn test_connection_error_names_the_culprit() {
        let config = ConnectionConfig {
            database: Some(String::from("shop")),
            username: Some(String::from("sa")),
            ..ConnectionConfig::default()
        };
        let err = connection_error(
            DriverError::new("Cannot open database \"shop\" requested by the login."),
            &config,
        );
        assert_eq!(err.kind(), Some(ErrorKind::ConnectionUnavailable));
        assert!(err.to_string().contains("We could not find your database: shop"));

        let err = connection_error(DriverError::new("Login failed for user 'sa'."), &config);
        assert!(err.to_string().contains("Access denied for user sa"));

        let err = connection_error(DriverError::new("The TCP/IP connection to the host localhost failed."), &config);
        assert!(err.to_string().contains("hostname: localhost"));
    }
}
