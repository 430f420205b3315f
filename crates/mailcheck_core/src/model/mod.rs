//! Domain model for validated email address records.
//!
//! # Responsibility
//! - Define the single canonical entity shared by every storage backend.
//! - Keep validation pure and synchronous so it runs before any I/O.
//!
//! # Invariants
//! - An `EmailAddress` can only be built or mutated through validating APIs.

pub mod email_address;
