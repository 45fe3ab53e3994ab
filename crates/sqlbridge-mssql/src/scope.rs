//! Session options that are switched on for one operation.
//!
//! `SET IDENTITY_INSERT` and `SET SHOWPLAN_ALL` stay in effect for the
//! whole session, so they must be switched off again on every exit path.
//! A [`SessionScope`] runs the enabling statements when it is created and
//! the disabling statements on [`SessionScope::finish`] or on drop.

use sqlbridge_core::connection::RawConnection;
use sqlbridge_core::error::{AdapterError, Result, StatementError};
use tracing::{debug, warn};

/// A session option held on for the lifetime of the scope.
#[derive(Debug)]
pub struct SessionScope<'c, C: RawConnection> {
    connection: &'c mut C,
    label: String,
    disable_sql: Vec<String>,
    active: bool,
}

impl<'c, C: RawConnection> SessionScope<'c, C> {
    /// Runs `enable_sql` and returns a scope that runs `disable_sql` when
    /// it ends.
    ///
    /// `label` names the option in error messages, e.g.
    /// `IDENTITY_INSERT` or `SHOWPLAN_ALL`; `context` is appended to it.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::StatementInvalid`] when the option cannot be
    /// turned on. The disabling statement is still attempted.
    pub fn enable(
        connection: &'c mut C,
        label: &str,
        context: &str,
        enable_sql: &str,
        disable_sql: &str,
    ) -> Result<Self> {
        Self::enable_all(
            connection,
            label,
            context,
            &[enable_sql.to_string()],
            vec![disable_sql.to_string()],
        )
    }

    /// Runs every statement of `enable_sql` in order and returns a scope
    /// that runs all of `disable_sql` when it ends.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::StatementInvalid`] for the first enabling
    /// statement that fails. Every disabling statement is still attempted.
    pub fn enable_all(
        connection: &'c mut C,
        label: &str,
        context: &str,
        enable_sql: &[String],
        disable_sql: Vec<String>,
    ) -> Result<Self> {
        let mut scope = Self {
            connection,
            label: label.to_string(),
            disable_sql,
            active: true,
        };
        for sql in enable_sql {
            debug!(sql = %sql, "Enabling session option");
            if let Err(error) = scope.connection.execute(sql) {
                let message = format!("{label} could not be turned ON{context} due : {}", error.message);
                return Err(AdapterError::StatementInvalid(
                    StatementError::new(message).with_sql(sql.as_str()).with_cause(error),
                ));
            }
        }
        Ok(scope)
    }

    /// The connection the option is active on.
    pub fn connection(&mut self) -> &mut C {
        self.connection
    }

    /// Turns the option off.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::StatementInvalid`] for the first disabling
    /// statement that fails; the remaining ones still run.
    pub fn finish(mut self) -> Result<()> {
        self.active = false;
        let mut failure = None;
        for sql in &self.disable_sql {
            debug!(sql = %sql, "Disabling session option");
            if let Err(error) = self.connection.execute(sql) {
                warn!(sql = %sql, error = %error, "Failed to reset session option");
                failure.get_or_insert((sql.clone(), error));
            }
        }
        match failure {
            None => Ok(()),
            Some((sql, error)) => {
                let message = format!("{} could not be turned OFF due : {}", self.label, error.message);
                Err(AdapterError::StatementInvalid(
                    StatementError::new(message).with_sql(sql).with_cause(error),
                ))
            }
        }
    }
}

impl<C: RawConnection> Drop for SessionScope<'_, C> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        for sql in &self.disable_sql {
            if let Err(error) = self.connection.execute(sql) {
                warn!(sql = %sql, error = %error, "Failed to reset session option");
            }
        }
    }
}
