//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the unit-of-work contract for email address storage.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Only validated `EmailAddress` values can be staged.
//! - Constraint failures surface as `RepoError::IntegrityViolation`, not raw
//!   transport errors.

pub mod email_address_repo;
