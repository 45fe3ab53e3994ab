//! Server version detection.

use sqlbridge_core::connection::RowSet;
use sqlbridge_core::error::{AdapterError, Result};
use sqlbridge_core::value::SqlValue;

/// Query returning version, major version, level and edition.
pub const VERSION_QUERY: &str = "SELECT CAST(SERVERPROPERTY('productVersion') AS VARCHAR(128)), \
     CAST(SERVERPROPERTY('productMajorVersion') AS VARCHAR(128)), \
     CAST(SERVERPROPERTY('productLevel') AS VARCHAR(128)), \
     CAST(SERVERPROPERTY('edition') AS VARCHAR(128))";

/// Oldest supported major version (SQL Server 2016).
pub const MINIMUM_MAJOR_VERSION: u32 = 13;

const VERSION_YEARS: &[(u32, &str)] = &[
    (8, "2000"),
    (9, "2005"),
    (10, "2008"),
    (11, "2012"),
    (12, "2014"),
    (13, "2016"),
    (14, "2017"),
    (15, "2019"),
    (16, "2022"),
];

/// Version information reported by `SERVERPROPERTY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    /// Full version, e.g. `15.0.2000.5`.
    pub complete: String,
    /// Major version, e.g. `15`.
    pub major: Option<u32>,
    /// Product level, e.g. `RTM`.
    pub level: Option<String>,
    /// Edition, e.g. `Developer Edition (64-bit)`.
    pub edition: Option<String>,
}

fn text(row: &[SqlValue], index: usize) -> Option<String> {
    match row.get(index)? {
        SqlValue::Null => None,
        value => Some(value.display_text()),
    }
}

impl ServerVersion {
    /// Parses a full version string such as `16.0.1000.6`.
    #[must_use]
    pub fn parse(complete: &str) -> Self {
        Self {
            complete: complete.to_string(),
            major: complete.split('.').next().and_then(|major| major.trim().parse().ok()),
            level: None,
            edition: None,
        }
    }

    /// Reads the first row of [`VERSION_QUERY`].
    ///
    /// The major version falls back to the first part of the full version
    /// when `productMajorVersion` is not reported.
    #[must_use]
    pub fn from_rows(rows: &RowSet) -> Option<Self> {
        let row = rows.rows.first()?;
        let complete = text(row, 0)?;
        let fallback = Self::parse(&complete);
        Some(Self {
            major: text(row, 1)
                .and_then(|major| major.trim().parse().ok())
                .or(fallback.major),
            level: text(row, 2),
            edition: text(row, 3),
            complete,
        })
    }

    /// Release year of the major version.
    #[must_use]
    pub fn year(&self) -> Option<&'static str> {
        let major = self.major?;
        VERSION_YEARS
            .iter()
            .find(|(candidate, _)| *candidate == major)
            .map(|(_, year)| *year)
    }

    /// Marketing name, e.g. `Microsoft SQL Server 2019`.
    #[must_use]
    pub fn product_name(&self) -> String {
        self.year().map_or_else(
            || String::from("Microsoft SQL Server"),
            |year| format!("Microsoft SQL Server {year}"),
        )
    }

    /// Whether the adapter supports this server.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.major.is_some_and(|major| major >= MINIMUM_MAJOR_VERSION)
    }

    /// Statement of the supported range.
    #[must_use]
    pub fn support_message() -> String {
        format!("This adapter supports Microsoft SQL Server >= {}.", minimum_year())
    }

    /// Rejects servers older than [`MINIMUM_MAJOR_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedServerVersion`].
    pub fn check(&self) -> Result<()> {
        if self.is_supported() {
            return Ok(());
        }
        Err(AdapterError::UnsupportedServerVersion {
            product: self.product_name(),
            detected: self.complete.clone(),
            minimum: format!("{MINIMUM_MAJOR_VERSION} ({})", minimum_year()),
        })
    }
}

fn minimum_year() -> &'static str {
    VERSION_YEARS
        .iter()
        .find(|(major, _)| *major == MINIMUM_MAJOR_VERSION)
        .map_or("2016", |(_, year)| *year)
}
