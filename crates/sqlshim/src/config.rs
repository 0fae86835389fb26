//! Connection configuration and driver selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// Parameters handed to `connect`.
///
/// SQLite only reads `location`; the remaining fields are reserved for
/// server-based engines and are ignored today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Database file path, or `:memory:` for a private in-memory database.
    #[serde(alias = "filename")]
    pub location: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl ConnectionConfig {
    /// Config pointing at a SQLite file.
    pub fn sqlite(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::default()
        }
    }

    /// Config for a private in-memory SQLite database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::sqlite(":memory:")
    }

    /// Returns the non-empty location or a configuration error.
    pub(crate) fn require_location(&self) -> Result<&str, DbError> {
        match self.location.as_deref().map(str::trim) {
            Some(location) if !location.is_empty() => Ok(location),
            _ => Err(DbError::Configuration(
                "SQLite requires a database location".to_string(),
            )),
        }
    }
}

/// Known driver implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Embedded SQLite via sqlx.
    #[default]
    Sqlite,
}

impl DriverKind {
    /// Name used on the command line and in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(DbError::Configuration(format!(
                "unsupported database type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_location() {
        assert_eq!(
            ConnectionConfig::sqlite("app.db").require_location().unwrap(),
            "app.db"
        );
        assert!(matches!(
            ConnectionConfig::default().require_location(),
            Err(DbError::Configuration(_))
        ));
        assert!(matches!(
            ConnectionConfig::sqlite("  ").require_location(),
            Err(DbError::Configuration(_))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config: ConnectionConfig = serde_json::from_str(r#"{"filename": "test.db"}"#).unwrap();
        assert_eq!(config.location.as_deref(), Some("test.db"));
        assert!(config.host.is_none());
    }

    #[test]
    fn test_driver_kind() {
        assert_eq!("sqlite".parse::<DriverKind>().unwrap(), DriverKind::Sqlite);
        assert_eq!("SQLite".parse::<DriverKind>().unwrap(), DriverKind::Sqlite);
        assert!(matches!(
            "postgres".parse::<DriverKind>(),
            Err(DbError::Configuration(_))
        ));
        assert_eq!(DriverKind::Sqlite.to_string(), "sqlite");
    }
}
