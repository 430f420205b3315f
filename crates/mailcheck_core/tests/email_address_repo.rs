use mailcheck_core::db::migrations::latest_version;
use mailcheck_core::db::open_db_in_memory;
use mailcheck_core::{
    EmailAddress, EmailAddressRepository, RepoError, SqliteEmailAddressRepository,
};
use rusqlite::{Connection, ErrorCode};

#[test]
fn commit_roundtrip_assigns_ids() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    repo.add(EmailAddress::new("a@b.com", "c@d.com").unwrap()).unwrap();
    assert_eq!(repo.pending_count(), 1);
    assert_eq!(repo.count().unwrap(), 0);

    let committed = repo.commit().unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(repo.pending_count(), 0);

    let id = committed[0].id().unwrap();
    let loaded = repo.get(id).unwrap().unwrap();
    assert_eq!(loaded.email(), "a@b.com");
    assert_eq!(loaded.backup_email(), "c@d.com");
    assert_eq!(loaded.id(), Some(id));
}

#[test]
fn add_all_commits_in_staging_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    let rows = ["one@x.io", "two@x.io", "three@x.io"]
        .into_iter()
        .map(|email| EmailAddress::new(email, "backup@x.io").unwrap())
        .collect();
    repo.add_all(rows).unwrap();
    let committed = repo.commit().unwrap();

    let ids: Vec<_> = committed.iter().map(|row| row.id().unwrap()).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let listed: Vec<_> = repo
        .list()
        .unwrap()
        .into_iter()
        .map(|row| row.email().to_string())
        .collect();
    assert_eq!(listed, ["one@x.io", "two@x.io", "three@x.io"]);
}

#[test]
fn empty_commit_is_a_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    assert!(repo.commit().unwrap().is_empty());
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn get_missing_id_returns_none() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    assert!(repo.get(42).unwrap().is_none());
}

#[test]
fn duplicate_primary_key_is_integrity_violation_and_rollback_recovers() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    repo.add(EmailAddress::new("a@b.com", "c@d.com").unwrap()).unwrap();
    let id = repo.commit().unwrap()[0].id().unwrap();

    repo.add(EmailAddress::with_id(id, "dup@b.com", "dup@d.com").unwrap()).unwrap();
    let err = repo.commit().unwrap_err();
    assert!(matches!(err, RepoError::IntegrityViolation(_)), "{err}");

    let blocked = repo
        .add(EmailAddress::new("next@b.com", "next@d.com").unwrap())
        .unwrap_err();
    assert!(matches!(blocked, RepoError::PendingRollback));
    assert!(matches!(repo.commit(), Err(RepoError::PendingRollback)));
    assert!(matches!(repo.delete_all(), Err(RepoError::PendingRollback)));

    assert_eq!(repo.rollback(), 1);
    assert_eq!(repo.pending_count(), 0);

    repo.add(EmailAddress::new("next@b.com", "next@d.com").unwrap()).unwrap();
    let committed = repo.commit().unwrap();
    assert_eq!(committed[0].email(), "next@b.com");
    assert_eq!(repo.count().unwrap(), 2);
    assert_eq!(repo.get(id).unwrap().unwrap().email(), "a@b.com");
}

#[test]
fn failed_commit_persists_nothing_from_the_batch() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    repo.add(EmailAddress::new("a@b.com", "c@d.com").unwrap()).unwrap();
    let id = repo.commit().unwrap()[0].id().unwrap();

    repo.add_all(vec![
        EmailAddress::new("fresh@b.com", "fresh@d.com").unwrap(),
        EmailAddress::with_id(id, "dup@b.com", "dup@d.com").unwrap(),
    ])
    .unwrap();
    assert!(matches!(repo.commit(), Err(RepoError::IntegrityViolation(_))));
    repo.rollback();

    let emails: Vec<_> = repo
        .list()
        .unwrap()
        .into_iter()
        .map(|row| row.email().to_string())
        .collect();
    assert_eq!(emails, ["a@b.com"]);
}

#[test]
fn loaded_row_mutation_commits_as_update() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    repo.add(EmailAddress::new("a@b.com", "c@d.com").unwrap()).unwrap();
    let id = repo.commit().unwrap()[0].id().unwrap();

    let mut loaded = repo.get(id).unwrap().unwrap();
    assert!(loaded.is_persisted());
    loaded.set_email("changed@b.com").unwrap();
    repo.add(loaded).unwrap();

    let committed = repo.commit().unwrap();
    assert_eq!(committed[0].id(), Some(id));
    assert_eq!(repo.count().unwrap(), 1);

    let reloaded = repo.get(id).unwrap().unwrap();
    assert_eq!(reloaded.email(), "changed@b.com");
    assert_eq!(reloaded.backup_email(), "c@d.com");
}

#[test]
fn committed_record_can_be_mutated_and_recommitted() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    repo.add(EmailAddress::new("a@b.com", "c@d.com").unwrap()).unwrap();
    let mut saved = repo.commit().unwrap().remove(0);
    assert!(saved.is_persisted());

    saved.set_backup_email("backup@d.com").unwrap();
    repo.add_all(vec![
        saved.clone(),
        EmailAddress::new("new@b.com", "new@d.com").unwrap(),
    ])
    .unwrap();
    repo.commit().unwrap();

    let rows = repo.list().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id(), saved.id());
    assert_eq!(rows[0].backup_email(), "backup@d.com");
    assert_eq!(rows[1].email(), "new@b.com");
}

#[test]
fn update_of_deleted_row_fails_and_rolls_back_batch() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    repo.add(EmailAddress::new("a@b.com", "c@d.com").unwrap()).unwrap();
    let mut stale = repo.commit().unwrap().remove(0);
    let id = stale.id().unwrap();
    repo.delete_all().unwrap();

    stale.set_email("changed@b.com").unwrap();
    repo.add_all(vec![
        EmailAddress::new("fresh@b.com", "fresh@d.com").unwrap(),
        stale,
    ])
    .unwrap();

    let err = repo.commit().unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id), "{err}");
    assert!(matches!(repo.commit(), Err(RepoError::PendingRollback)));

    assert_eq!(repo.rollback(), 2);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn delete_all_removes_every_row_immediately() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();

    let rows = (0..5)
        .map(|n| EmailAddress::new(format!("user{n}@x.io"), "b@x.io").unwrap())
        .collect();
    repo.add_all(rows).unwrap();
    repo.commit().unwrap();
    assert_eq!(repo.count().unwrap(), 5);

    repo.add(EmailAddress::new("staged@x.io", "b@x.io").unwrap()).unwrap();
    assert_eq!(repo.delete_all().unwrap(), 5);
    assert_eq!(repo.count().unwrap(), 0);
    assert_eq!(repo.pending_count(), 1);

    assert_eq!(repo.delete_all().unwrap(), 0);
}

#[test]
fn raw_sql_bypassing_validation_hits_check_constraint() {
    let conn = open_db_in_memory().unwrap();

    let err = conn
        .execute(
            "INSERT INTO emailaddress (email, backup_email) VALUES ('nope', 'a@b.com');",
            [],
        )
        .unwrap_err();
    assert_eq!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation));
}

#[test]
fn read_paths_reject_invalid_persisted_rows() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE emailaddress (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL,
            backup_email TEXT NOT NULL
        );
        INSERT INTO emailaddress (email, backup_email) VALUES ('broken', 'ok@x.io');
        PRAGMA user_version = {};",
        latest_version()
    )).unwrap();

    let repo = SqliteEmailAddressRepository::try_new(&mut conn).unwrap();
    let err = repo.list().unwrap_err();
    match err {
        RepoError::InvalidData(message) => assert!(message.contains("emailaddress.email")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    match SqliteEmailAddressRepository::try_new(&mut conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version())).unwrap();

    assert!(matches!(
        SqliteEmailAddressRepository::try_new(&mut conn),
        Err(RepoError::MissingRequiredTable("emailaddress"))
    ));
}

#[test]
fn repository_rejects_connection_missing_column() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE emailaddress (id INTEGER PRIMARY KEY, email TEXT NOT NULL);
         PRAGMA user_version = {};",
        latest_version()
    )).unwrap();

    assert!(matches!(
        SqliteEmailAddressRepository::try_new(&mut conn),
        Err(RepoError::MissingRequiredColumn {
            table: "emailaddress",
            column: "backup_email"
        })
    ));
}
