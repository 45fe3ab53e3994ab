//! Rule-based translation of driver errors into [`AdapterError`]s.
//!
//! Rules are checked in order and the first match decides the error kind.
//! A driver error no rule claims becomes [`ErrorKind::StatementInvalid`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::connection::DriverError;
use crate::error::{AdapterError, ErrorKind, StatementError};
use crate::value::SqlValue;

/// What a rule inspects.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regular expression over the native message.
    Message(Regex),
    /// SQLSTATE prefix (a class such as `08` or a full state).
    SqlState(&'static str),
    /// Vendor error code.
    Code(i32),
}

impl Matcher {
    fn matches(&self, error: &DriverError) -> bool {
        match self {
            Self::Message(pattern) => pattern.is_match(&error.message),
            Self::SqlState(prefix) => error
                .sql_state
                .as_deref()
                .is_some_and(|state| state.starts_with(prefix)),
            Self::Code(code) => error.code == Some(*code),
        }
    }
}

/// A single translation rule.
#[derive(Debug, Clone)]
pub struct TranslationRule {
    /// Condition.
    pub matcher: Matcher,
    /// Resulting kind.
    pub kind: ErrorKind,
}

/// Ordered list of translation rules.
#[derive(Debug, Clone, Default)]
pub struct ErrorTranslator {
    rules: Vec<TranslationRule>,
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("error translation patterns are valid")
}

impl ErrorTranslator {
    /// Creates a translator without rules.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule.
    #[must_use]
    pub fn rule(mut self, matcher: Matcher, kind: ErrorKind) -> Self {
        self.rules.push(TranslationRule { matcher, kind });
        self
    }

    /// Appends a message rule.
    #[must_use]
    pub fn message(self, pattern: Regex, kind: ErrorKind) -> Self {
        self.rule(Matcher::Message(pattern), kind)
    }

    /// Appends a SQLSTATE rule.
    #[must_use]
    pub fn sql_state(self, prefix: &'static str, kind: ErrorKind) -> Self {
        self.rule(Matcher::SqlState(prefix), kind)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Kind assigned to `error` by the first matching rule.
    #[must_use]
    pub fn classify(&self, error: &DriverError) -> ErrorKind {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(error))
            .map_or(ErrorKind::StatementInvalid, |rule| rule.kind)
    }

    /// Translates a driver error raised while running `sql` with `binds`.
    #[must_use]
    pub fn translate(&self, error: DriverError, sql: Option<&str>, binds: &[SqlValue]) -> AdapterError {
        let kind = self.classify(&error);
        debug!(kind = %kind, message = %error.message, "Translated driver error");
        let mut context = StatementError::from_driver(error).with_binds(binds);
        if let Some(sql) = sql {
            context = context.with_sql(sql);
        }
        AdapterError::from_kind(kind, context)
    }

    /// Rules keyed on SQLSTATE classes, shared by standards-following engines.
    #[must_use]
    pub fn sql_state_rules(self) -> Self {
        self.sql_state("08", ErrorKind::ConnectionUnavailable)
            .sql_state("23505", ErrorKind::UniquenessViolation)
            .sql_state("23502", ErrorKind::NotNullViolation)
            .sql_state("23503", ErrorKind::ForeignKeyViolation)
            .sql_state("22001", ErrorKind::ValueTooLong)
            .sql_state("22003", ErrorKind::NumericOverflow)
    }

    /// PostgreSQL rules.
    #[must_use]
    pub fn postgres() -> Self {
        Self::new()
            .sql_state_rules()
            .sql_state("55P03", ErrorKind::LockTimeout)
            .message(pattern(r"(?i)lock timeout"), ErrorKind::LockTimeout)
    }

    /// DB2 rules.
    #[must_use]
    pub fn db2() -> Self {
        Self::new()
            .sql_state_rules()
            .sql_state("23504", ErrorKind::ForeignKeyViolation)
            .rule(Matcher::Code(-911), ErrorKind::LockTimeout)
            .rule(Matcher::Code(-913), ErrorKind::LockTimeout)
            .message(pattern(r"SQLCODE=-803"), ErrorKind::UniquenessViolation)
            .message(pattern(r"SQLCODE=-407"), ErrorKind::NotNullViolation)
            .message(pattern(r"SQLCODE=-530"), ErrorKind::ForeignKeyViolation)
            .message(pattern(r"SQLCODE=-302"), ErrorKind::ValueTooLong)
    }

    /// SQLite rules.
    #[must_use]
    pub fn sqlite() -> Self {
        Self::new()
            .message(
                pattern(r"(?i)UNIQUE constraint failed|is not unique"),
                ErrorKind::UniquenessViolation,
            )
            .message(
                pattern(r"(?i)NOT NULL constraint failed|may not be NULL"),
                ErrorKind::NotNullViolation,
            )
            .message(
                pattern(r"(?i)FOREIGN KEY constraint failed"),
                ErrorKind::ForeignKeyViolation,
            )
            .message(pattern(r"(?i)database is locked"), ErrorKind::LockTimeout)
            .message(
                pattern(r"(?i)unable to open database|database connection closed"),
                ErrorKind::ConnectionUnavailable,
            )
    }

    /// Rules for engines without a dedicated preset.
    #[must_use]
    pub fn generic() -> Self {
        Self::new()
            .sql_state_rules()
            .message(pattern(r"(?i)no connection available"), ErrorKind::ConnectionUnavailable)
            .message(pattern(r"(?i)duplicate key|unique constraint"), ErrorKind::UniquenessViolation)
    }
}

/// Translator used by [`crate::dialect::GenericDialect`].
pub static GENERIC_TRANSLATOR: LazyLock<ErrorTranslator> = LazyLock::new(ErrorTranslator::generic);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let translator = ErrorTranslator::new()
            .message(pattern("(?i)duplicate"), ErrorKind::UniquenessViolation)
            .message(pattern("(?i)key"), ErrorKind::ForeignKeyViolation);
        let err = DriverError::new("Duplicate key found");
        assert_eq!(translator.classify(&err), ErrorKind::UniquenessViolation);
    }

    #[test]
    fn test_unmatched_falls_back_to_statement_invalid() {
        let translator = ErrorTranslator::postgres();
        let err = translator.translate(DriverError::new("syntax error at or near"), Some("SELEC 1"), &[]);
        assert!(matches!(err, AdapterError::StatementInvalid(_)));
        assert_eq!(err.statement().and_then(|s| s.sql.as_deref()), Some("SELEC 1"));
    }

    #[test]
    fn test_sql_state_rules() {
        let translator = ErrorTranslator::postgres();
        let unique = DriverError::new("duplicate key value").with_sql_state("23505");
        assert_eq!(translator.classify(&unique), ErrorKind::UniquenessViolation);
        let gone = DriverError::new("connection reset").with_sql_state("08006");
        assert_eq!(translator.classify(&gone), ErrorKind::ConnectionUnavailable);
    }

    #[test]
    fn test_db2_codes() {
        let translator = ErrorTranslator::db2();
        let deadlock = DriverError::new("deadlock or timeout").with_code(-911);
        assert_eq!(translator.classify(&deadlock), ErrorKind::LockTimeout);
    }

    #[test]
    fn test_sqlite_messages() {
        let translator = ErrorTranslator::sqlite();
        let err = DriverError::new("UNIQUE constraint failed: users.email");
        assert_eq!(translator.classify(&err), ErrorKind::UniquenessViolation);
        let binds = [SqlValue::Text(String::from("a@b.c"))];
        let translated = translator.translate(err, None, &binds);
        assert_eq!(translated.statement().map(|s| s.binds.len()), Some(1));
    }
}
