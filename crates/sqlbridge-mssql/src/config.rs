//! Connection settings and JDBC URL construction.

use std::fmt::Write as _;

use serde::Deserialize;
use sqlbridge_core::connection::Credentials;
use sqlbridge_core::error::AdapterError;
use sqlbridge_core::quoting::DefaultTimezone;

/// Lock timeout applied when none is configured, in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT: u64 = 5000;

/// Errors raised while reading connection settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings document is not valid JSON for [`ConnectionConfig`].
    #[error("Invalid connection settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// The host is empty and no URL override is given.
    #[error("A host or url must be configured")]
    MissingHost,
}

impl From<ConfigError> for AdapterError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

/// Transaction isolation set on every new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// `READ UNCOMMITTED`.
    ReadUncommitted,
    /// `READ COMMITTED`.
    ReadCommitted,
    /// `REPEATABLE READ`.
    RepeatableRead,
    /// `SERIALIZABLE`.
    Serializable,
    /// `SNAPSHOT`.
    Snapshot,
}

impl IsolationLevel {
    /// SQL keyword form.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
            Self::Snapshot => "SNAPSHOT",
        }
    }
}

/// Settings for one SQL Server database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Server host.
    pub host: String,
    /// TCP port; the driver default applies when unset.
    pub port: Option<u16>,
    /// Database name.
    pub database: Option<String>,
    /// Named instance.
    pub instance: Option<String>,
    /// Login name.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Send `java.sql.Time` values as `datetime` instead of `time`.
    pub send_time_as_datetime: bool,
    /// Login timeout in seconds.
    pub login_timeout: Option<u64>,
    /// Lock timeout in milliseconds.
    pub lock_timeout: u64,
    /// Encrypt the connection.
    pub encrypt: Option<bool>,
    /// Skip server certificate validation.
    pub trust_server_certificate: Option<bool>,
    /// Application name reported to the server.
    #[serde(alias = "appname", alias = "application")]
    pub application_name: Option<String>,
    /// Use Windows authentication.
    pub integrated_security: Option<bool>,
    /// Isolation level set after connecting.
    pub transaction_isolation: Option<IsolationLevel>,
    /// Full JDBC URL; replaces the generated one.
    pub url: Option<String>,
    /// Timezone zone-aware values are converted to.
    pub default_timezone: DefaultTimezone,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: None,
            database: None,
            instance: None,
            username: None,
            password: None,
            send_time_as_datetime: false,
            login_timeout: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            encrypt: None,
            trust_server_certificate: None,
            application_name: None,
            integrated_security: None,
            transaction_isolation: None,
            url: None,
            default_timezone: DefaultTimezone::Utc,
        }
    }
}

impl ConnectionConfig {
    /// Parses settings from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input and
    /// [`ConfigError::MissingHost`] when neither host nor url is usable.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that a URL can be built.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingHost`] when the host is blank and no
    /// URL override is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_none() && self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        Ok(())
    }

    /// The JDBC URL: the override when set, otherwise
    /// `jdbc:sqlserver://host[:port];key=value;...`.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let mut url = format!("jdbc:sqlserver://{}", self.host);
        match self.port {
            Some(port) => {
                let _ = write!(url, ":{port};");
            }
            None => url.push(';'),
        }
        let mut property = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                let _ = write!(url, "{key}={value};");
            }
        };
        property("databaseName", self.database.clone());
        property("instanceName", self.instance.clone());
        property(
            "sendTimeAsDatetime",
            Some(self.send_time_as_datetime.to_string()),
        );
        property("loginTimeout", self.login_timeout.map(|t| t.to_string()));
        property("lockTimeout", Some(self.lock_timeout.to_string()));
        property("encrypt", self.encrypt.map(|b| b.to_string()));
        property(
            "trustServerCertificate",
            self.trust_server_certificate.map(|b| b.to_string()),
        );
        property("applicationName", self.application_name.clone());
        property(
            "integratedSecurity",
            self.integrated_security.map(|b| b.to_string()),
        );
        url
    }

    /// Login credentials handed to the driver.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}
