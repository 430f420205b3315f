//! Fixed-content seed data for the `emailaddress` table.
//!
//! # Invariants
//! - Seeding replaces the whole table: delete first, then one commit.
//! - Seed values satisfy `@` validation, so staging cannot fail.

use crate::model::email_address::EmailAddress;
use crate::repo::email_address_repo::{EmailAddressRepository, RepoResult};
use log::info;

/// Rows inserted by one seed run.
pub const SEED_ROW_COUNT: usize = 25;
/// Value used for both address fields of every seeded row.
pub const SEED_ADDRESS: &str = "email@email.com";

/// Counts reported by `seed_email_addresses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub deleted: usize,
    pub inserted: usize,
}

/// Clears the table and inserts `SEED_ROW_COUNT` constant rows.
pub fn seed_email_addresses<R>(repo: &mut R) -> RepoResult<SeedReport>
where
    R: EmailAddressRepository + ?Sized,
{
    let deleted = repo.delete_all()?;

    let rows = (0..SEED_ROW_COUNT)
        .map(|_| EmailAddress::new(SEED_ADDRESS, SEED_ADDRESS))
        .collect::<Result<Vec<_>, _>>()?;
    repo.add_all(rows)?;
    let inserted = repo.commit()?.len();

    info!("event=seed_run module=service status=ok deleted={deleted} inserted={inserted}");
    Ok(SeedReport { deleted, inserted })
}
