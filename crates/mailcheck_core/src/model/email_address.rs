//! Email address domain model.
//!
//! # Responsibility
//! - Define the canonical `EmailAddress` record persisted in `emailaddress`.
//! - Enforce the `@` containment rule whenever a field is assigned.
//!
//! # Invariants
//! - `email` and `backup_email` always contain at least one `@`.
//! - A rejected assignment never replaces the previous field value.
//! - `id` is `None` until storage assigns a surrogate key on commit, unless
//!   the caller picked the key with `with_id`.
//! - Only records loaded from or committed to storage count as persisted;
//!   the repository updates those in place and inserts everything else.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate key assigned by storage on insert.
pub type EmailAddressId = i64;

/// Validated field of an `EmailAddress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailField {
    /// Primary contact address.
    Email,
    /// Fallback contact address.
    BackupEmail,
}

impl EmailField {
    /// Column name used by storage and in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::BackupEmail => "backup_email",
        }
    }
}

impl Display for EmailField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors raised on field assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The assigned value has no `@` character.
    MissingAtSign { field: EmailField },
}

impl ValidationError {
    /// Field that rejected the assignment.
    pub fn field(&self) -> EmailField {
        match self {
            Self::MissingAtSign { field } => *field,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAtSign { field } => {
                write!(f, "failed simple email validation: `{field}` must contain '@'")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks one address value for `field`.
///
/// Returns `address` unchanged when it contains `@`. This is a plain
/// substring test: domain shape and the number of `@` signs are not checked.
pub fn validate_address(
    field: EmailField,
    address: impl Into<String>,
) -> Result<String, ValidationError> {
    let address = address.into();
    if !address.contains('@') {
        return Err(ValidationError::MissingAtSign { field });
    }
    Ok(address)
}

/// Canonical email address record.
///
/// Fields are private so every write goes through validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EmailAddressRecord")]
pub struct EmailAddress {
    id: Option<EmailAddressId>,
    email: String,
    backup_email: String,
    #[serde(skip)]
    persisted: bool,
}

impl EmailAddress {
    /// Creates an unsaved address pair.
    ///
    /// # Errors
    /// - Returns `ValidationError::MissingAtSign` for the first field without `@`.
    pub fn new(
        email: impl Into<String>,
        backup_email: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: None,
            email: validate_address(EmailField::Email, email)?,
            backup_email: validate_address(EmailField::BackupEmail, backup_email)?,
            persisted: false,
        })
    }

    /// Creates a new record with a caller-chosen storage id.
    ///
    /// The record is still inserted on commit, so staging it collides with
    /// the existing row if `id` is already taken.
    pub fn with_id(
        id: EmailAddressId,
        email: impl Into<String>,
        backup_email: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let mut address = Self::new(email, backup_email)?;
        address.id = Some(id);
        Ok(address)
    }

    pub fn id(&self) -> Option<EmailAddressId> {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn backup_email(&self) -> &str {
        &self.backup_email
    }

    /// Replaces `email`; keeps the old value on error.
    pub fn set_email(&mut self, address: impl Into<String>) -> Result<(), ValidationError> {
        self.email = validate_address(EmailField::Email, address)?;
        Ok(())
    }

    /// Replaces `backup_email`; keeps the old value on error.
    pub fn set_backup_email(&mut self, address: impl Into<String>) -> Result<(), ValidationError> {
        self.backup_email = validate_address(EmailField::BackupEmail, address)?;
        Ok(())
    }

    /// Returns whether this record was loaded from or committed to storage.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub(crate) fn from_storage(
        id: EmailAddressId,
        email: impl Into<String>,
        backup_email: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let mut address = Self::with_id(id, email, backup_email)?;
        address.persisted = true;
        Ok(address)
    }

    pub(crate) fn mark_persisted(&mut self, id: EmailAddressId) {
        self.id = Some(id);
        self.persisted = true;
    }
}

#[derive(Deserialize)]
struct EmailAddressRecord {
    #[serde(default)]
    id: Option<EmailAddressId>,
    email: String,
    backup_email: String,
}

impl TryFrom<EmailAddressRecord> for EmailAddress {
    type Error = ValidationError;

    fn try_from(value: EmailAddressRecord) -> Result<Self, Self::Error> {
        let mut address = Self::new(value.email, value.backup_email)?;
        address.id = value.id;
        Ok(address)
    }
}
