//! Email address registration use-case.
//!
//! # Responsibility
//! - Validate, stage, and commit one address pair per call.
//! - Recover from integrity violations by rolling back the unit-of-work.
//!
//! # Invariants
//! - Invalid input never reaches the repository.
//! - A blocked registration leaves the repository writable.

use crate::model::email_address::{EmailAddress, EmailAddressId};
use crate::repo::email_address_repo::{EmailAddressRepository, RepoError, RepoResult};
use log::warn;

/// Message reported when storage blocks a commit.
pub const INTEGRITY_VIOLATION_MESSAGE: &str = "Integrity violation blocked!";

/// Result of one registration attempt that reached storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Row was committed; the record carries its assigned id.
    Persisted(EmailAddress),
    /// Storage rejected the row and the unit-of-work was rolled back.
    Blocked { reason: String },
}

/// Use-case service wrapper for email address registration.
pub struct EmailAddressService<R: EmailAddressRepository> {
    repo: R,
}

impl<R: EmailAddressRepository> EmailAddressService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and persists one address pair.
    ///
    /// # Errors
    /// - `RepoError::Validation` when either field lacks `@`; nothing is staged.
    /// - Any non-integrity storage error, unchanged.
    pub fn register(
        &mut self,
        email: impl Into<String>,
        backup_email: impl Into<String>,
    ) -> RepoResult<RegisterOutcome> {
        let address = EmailAddress::new(email, backup_email)?;
        self.register_address(address)
    }

    /// Persists an already validated record.
    pub fn register_address(&mut self, address: EmailAddress) -> RepoResult<RegisterOutcome> {
        self.repo.add(address)?;

        match self.repo.commit() {
            Ok(committed) => committed
                .into_iter()
                .next()
                .map(RegisterOutcome::Persisted)
                .ok_or_else(|| RepoError::InvalidData("commit returned no rows".to_string())),
            Err(RepoError::IntegrityViolation(reason)) => {
                warn!(
                    "event=integrity_violation module=service status=blocked message=\"{}\"",
                    INTEGRITY_VIOLATION_MESSAGE
                );
                self.repo.rollback();
                Ok(RegisterOutcome::Blocked { reason })
            }
            Err(err) => Err(err),
        }
    }

    pub fn get(&self, id: EmailAddressId) -> RepoResult<Option<EmailAddress>> {
        self.repo.get(id)
    }

    pub fn list(&self) -> RepoResult<Vec<EmailAddress>> {
        self.repo.list()
    }

    /// Gives back the wrapped repository.
    pub fn into_inner(self) -> R {
        self.repo
    }
}
