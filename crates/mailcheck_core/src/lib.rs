//! Core domain logic for mailcheck.
//! This crate is the single source of truth for email address invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, ConfigSettings, StorageTarget};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::email_address::{
    validate_address, EmailAddress, EmailAddressId, EmailField, ValidationError,
};
pub use repo::email_address_repo::{
    EmailAddressRepository, RepoError, RepoResult, SqliteEmailAddressRepository,
};
pub use service::app_context::AppContext;
pub use service::email_address_service::{
    EmailAddressService, RegisterOutcome, INTEGRITY_VIOLATION_MESSAGE,
};
pub use service::seed::{seed_email_addresses, SeedReport, SEED_ADDRESS, SEED_ROW_COUNT};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
