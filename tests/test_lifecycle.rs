//! Lifecycle operations against a live server.
//!
//! Run with `SA_DATABASE_URL` pointing at a superuser connection:
//! `cargo test --test test_lifecycle -- --ignored`

mod common;

use common::db_test_context::DbTestContext;
use diesel::{Connection, PgConnection};
use pgsetup::Probe;
use pgsetup::db::connection::Target;

fn context(name: &str, role: Option<&str>) -> DbTestContext {
    DbTestContext::from_env(name, role).expect("SA_DATABASE_URL must be set for live tests")
}

#[test]
#[ignore = "requires a PostgreSQL server at SA_DATABASE_URL"]
fn provision_then_teardown() {
    let ctx = context("pgsetup_lifecycle_test", None);
    let quiet = Probe {
        strict: false,
        quiet: true,
    };

    assert!(!ctx.lifecycle.exists(&ctx.db, quiet).unwrap());
    ctx.lifecycle.provision(&ctx.db).unwrap();
    assert!(ctx.lifecycle.exists(&ctx.db, quiet).unwrap());

    ctx.lifecycle.provision(&ctx.db).unwrap();
    assert!(ctx.lifecycle.exists(&ctx.db, quiet).unwrap());

    ctx.lifecycle.teardown(&ctx.db).unwrap();
    assert!(!ctx.lifecycle.exists(&ctx.db, quiet).unwrap());
    ctx.lifecycle.teardown(&ctx.db).unwrap();
}

#[test]
#[ignore = "requires a PostgreSQL server at SA_DATABASE_URL"]
fn provision_with_separate_owner_role() {
    let ctx = context("pgsetup_role_test", Some("pgsetup_test_owner"));
    assert!(ctx.db.has_distinct_role());

    ctx.lifecycle.provision(&ctx.db).unwrap();
    ctx.lifecycle.provision(&ctx.db).unwrap();
    assert!(ctx.lifecycle.exists(&ctx.db, Probe::default()).unwrap());

    ctx.lifecycle.teardown(&ctx.db).unwrap();
    assert!(!ctx.lifecycle.exists(&ctx.db, Probe::default()).unwrap());
}

#[test]
#[ignore = "requires a PostgreSQL server at SA_DATABASE_URL"]
fn evict_connections_clears_sessions() {
    let ctx = context("pgsetup_evict_test", None);
    ctx.lifecycle.provision(&ctx.db).unwrap();

    let _open = PgConnection::establish(&ctx.db.url()).unwrap();
    assert!(ctx.lifecycle.count_connections(&ctx.db).unwrap() >= 1);

    assert!(ctx.lifecycle.evict_connections(&ctx.db).unwrap() >= 1);
}

#[test]
#[ignore = "requires a PostgreSQL server at SA_DATABASE_URL"]
fn administrative_session_opens() {
    let ctx = context("pgsetup_admin_test", None);
    let session = ctx
        .lifecycle
        .connector()
        .connect(&ctx.db, Target::Administrative);
    assert!(session.is_ok());
}
