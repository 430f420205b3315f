//! Process configuration.
//!
//! # Responsibility
//! - Layer defaults, `MAILCHECK_*` environment variables and caller
//!   overrides through `figment`.
//! - Parse `sqlite://` connection strings into a storage target.
//!
//! # Invariants
//! - Later layers win: defaults < environment < overrides.
//! - Blank values count as unset.
//! - Parsing is pure; no files are opened here.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::default_log_level;
use figment::providers::{Env, Serialized};
use figment::Figment;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Prefix of every environment variable read by `AppConfig::load`.
pub const ENV_PREFIX: &str = "MAILCHECK_";

/// Local file database next to the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///database.db";

const SQLITE_SCHEME: &str = "sqlite://";
const MEMORY_PATH: &str = ":memory:";

#[derive(Debug)]
pub enum ConfigError {
    /// A configuration layer could not be read or has the wrong shape.
    Load(Box<figment::Error>),
    /// Connection string does not start with `sqlite://`.
    UnsupportedScheme(String),
    /// Connection string has a host segment instead of a path.
    InvalidDatabaseUrl(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "failed to load configuration: {err}"),
            Self::UnsupportedScheme(url) => {
                write!(f, "unsupported database url `{url}`; expected sqlite://")
            }
            Self::InvalidDatabaseUrl(url) => write!(
                f,
                "invalid database url `{url}`; expected sqlite:///<path> or sqlite://:memory:"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err.as_ref()),
            Self::UnsupportedScheme(_) | Self::InvalidDatabaseUrl(_) => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Load(Box::new(value))
    }
}

/// Where the relational store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    File(PathBuf),
    Memory,
}

impl StorageTarget {
    /// Parses a `sqlite://` connection string.
    ///
    /// - `sqlite:///database.db` -> relative file `database.db`
    /// - `sqlite:////var/db/x.db` -> absolute file `/var/db/x.db`
    /// - `sqlite://`, `sqlite:///`, `sqlite://:memory:` -> in-memory
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim();
        let rest = trimmed
            .strip_prefix(SQLITE_SCHEME)
            .ok_or_else(|| ConfigError::UnsupportedScheme(trimmed.to_string()))?;

        if rest.is_empty() || rest == MEMORY_PATH {
            return Ok(Self::Memory);
        }

        let path = rest
            .strip_prefix('/')
            .ok_or_else(|| ConfigError::InvalidDatabaseUrl(trimmed.to_string()))?;
        if path.is_empty() || path == MEMORY_PATH {
            return Ok(Self::Memory);
        }
        Ok(Self::File(PathBuf::from(path)))
    }

    /// Opens and migrates a connection for this target.
    pub fn open(&self) -> DbResult<Connection> {
        match self {
            Self::File(path) => open_db(path),
            Self::Memory => open_db_in_memory(),
        }
    }
}

/// Raw settings as read from the configuration layers.
///
/// Keys match the environment variables without `MAILCHECK_`, lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: StorageTarget,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Configuration layers without caller overrides.
    pub fn figment() -> Figment {
        Figment::new().merge(Env::prefixed(ENV_PREFIX))
    }

    /// Reads configuration from `MAILCHECK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(ConfigSettings::default())
    }

    /// Reads the environment, then applies `overrides` on top.
    ///
    /// Unset override fields leave the environment value in place.
    pub fn load(overrides: ConfigSettings) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment().merge(Serialized::defaults(overrides)))
    }

    /// Extracts and validates settings from an arbitrary figment.
    ///
    /// # Errors
    /// - `ConfigError::Load` when a layer has the wrong shape.
    /// - `UnsupportedScheme` / `InvalidDatabaseUrl` from `StorageTarget::parse`.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let settings: ConfigSettings = figment.extract()?;

        let database_url =
            non_blank(settings.database_url).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let log_level =
            non_blank(settings.log_level).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = settings
            .log_dir
            .and_then(|dir| non_blank(Some(dir.to_string_lossy().into_owned())))
            .map(PathBuf::from);

        Ok(Self {
            database: StorageTarget::parse(&database_url)?,
            log_level,
            log_dir,
        })
    }

    /// In-memory database with logging off.
    pub fn in_memory() -> Self {
        Self {
            database: StorageTarget::Memory,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ConfigSettings, StorageTarget};
    use figment::Jail;
    use std::path::PathBuf;

    #[test]
    fn parse_relative_and_absolute_files() {
        assert_eq!(
            StorageTarget::parse("sqlite:///database.db").unwrap(),
            StorageTarget::File(PathBuf::from("database.db"))
        );
        assert_eq!(
            StorageTarget::parse("sqlite:////tmp/mail.db").unwrap(),
            StorageTarget::File(PathBuf::from("/tmp/mail.db"))
        );
    }

    #[test]
    fn parse_memory_forms() {
        for url in ["sqlite://", "sqlite:///", "sqlite://:memory:", "sqlite:///:memory:"] {
            assert_eq!(StorageTarget::parse(url).unwrap(), StorageTarget::Memory, "{url}");
        }
    }

    #[test]
    fn parse_rejects_other_schemes_and_hosts() {
        assert!(matches!(
            StorageTarget::parse("postgres://localhost/db"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            StorageTarget::parse("sqlite://host/db"),
            Err(ConfigError::InvalidDatabaseUrl(_))
        ));
    }

    #[test]
    fn blank_environment_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("MAILCHECK_DATABASE_URL", "");
            jail.set_env("MAILCHECK_LOG_LEVEL", "  ");
            jail.set_env("MAILCHECK_LOG_DIR", "");

            let config = AppConfig::from_env().unwrap();
            assert_eq!(
                config.database,
                StorageTarget::File(PathBuf::from("database.db"))
            );
            assert!(config.log_dir.is_none());
            assert!(!config.log_level.is_empty());
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("MAILCHECK_DATABASE_URL", "sqlite://:memory:");
            jail.set_env("MAILCHECK_LOG_LEVEL", "debug");
            jail.set_env("MAILCHECK_LOG_DIR", " /var/log/mailcheck ");

            let config = AppConfig::from_env().unwrap();
            assert_eq!(config.database, StorageTarget::Memory);
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/mailcheck")));
            Ok(())
        });
    }

    #[test]
    fn explicit_settings_win_over_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("MAILCHECK_DATABASE_URL", "sqlite:///from-env.db");
            jail.set_env("MAILCHECK_LOG_LEVEL", "warn");

            let config = AppConfig::load(ConfigSettings {
                database_url: Some("sqlite:///from-flag.db".to_string()),
                ..ConfigSettings::default()
            })
            .unwrap();
            assert_eq!(
                config.database,
                StorageTarget::File(PathBuf::from("from-flag.db"))
            );
            assert_eq!(config.log_level, "warn");
            Ok(())
        });
    }

    #[test]
    fn invalid_database_url_from_environment_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("MAILCHECK_DATABASE_URL", "postgres://localhost/db");

            let err = AppConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedScheme(_)), "{err}");
            Ok(())
        });
    }
}
