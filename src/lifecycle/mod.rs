//! Idempotent database lifecycle operations.
//!
//! Nothing is cached: every call probes the server. Provisioning and teardown
//! never roll back; each step tolerates the state a previous partial run left
//! behind, so re-running converges on the same end state.

pub mod classify;
pub mod sql;

use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::db::connection::{Connector, Driver, Session, Statement, Target};
use crate::db::descriptor::ConnectionDescriptor;
use crate::prelude::*;
use classify::{ObjectKind, ProbeFailure, classify_probe, is_duplicate};

/// How [`Lifecycle::exists`] treats failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Probe {
    /// Return unexpected connection failures instead of answering `false`.
    pub strict: bool,
    /// Log status at `debug` instead of `info`.
    pub quiet: bool,
}

fn status(quiet: bool, message: impl Display) {
    if quiet {
        debug!("{message}");
    } else {
        info!("{message}");
    }
}

fn run<S: Session>(session: &mut S, statement: &Statement) -> Result<usize> {
    debug!("Executing {statement}");
    session
        .execute(statement)
        .map_err(|source| Error::Statement {
            statement: statement.to_string(),
            source,
        })
}

fn count<S: Session>(session: &mut S, statement: &Statement) -> Result<i64> {
    debug!("Querying {statement}");
    session
        .count(statement)
        .map_err(|source| Error::Statement {
            statement: statement.to_string(),
            source,
        })
}

/// Create `name` unless the catalog already lists it. Returns whether it was
/// created. A concurrent creation between the lookup and the CREATE is
/// reported by the server as a duplicate and treated as already existing.
fn create_if_missing<S: Session>(
    session: &mut S,
    kind: ObjectKind,
    name: &str,
    create: Statement,
) -> Result<bool> {
    let lookup = match kind {
        ObjectKind::Role => sql::role_exists(name),
        ObjectKind::Database => sql::database_exists(name),
    };
    if count(session, &lookup)? > 0 {
        debug!("{kind:?} '{name}' already exists");
        return Ok(false);
    }
    debug!("Executing {create}");
    match session.execute(&create) {
        Ok(_) => Ok(true),
        Err(e) if is_duplicate(&e, kind, name) => {
            debug!("{kind:?} '{name}' was created concurrently");
            Ok(false)
        }
        Err(source) => Err(Error::Statement {
            statement: create.to_string(),
            source,
        }),
    }
}

/// Existence probe, provisioning, teardown and session eviction for one
/// database and its owning role.
#[derive(Debug, Clone)]
pub struct Lifecycle<D> {
    connector: Connector<D>,
}

impl<D: Driver> Lifecycle<D> {
    pub fn new(connector: Connector<D>) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &Connector<D> {
        &self.connector
    }

    /// Whether the database exists and the descriptor's credentials work.
    ///
    /// A missing database, role or password mismatch answers `false`. Other
    /// connection failures also answer `false` unless `probe.strict` is set.
    /// A missing url is always an error.
    pub fn exists(&self, db: &ConnectionDescriptor, probe: Probe) -> Result<bool> {
        match self.connector.connect(db, Target::Database) {
            Ok(session) => {
                drop(session);
                status(probe.quiet, format_args!("Database '{}' exists", db.name()));
                Ok(true)
            }
            Err(Error::Connection { target, source }) => {
                match classify_probe(&source) {
                    ProbeFailure::Absent => debug!("Database '{}': {source}", db.name()),
                    ProbeFailure::Unexpected if probe.strict => {
                        return Err(Error::Connection { target, source });
                    }
                    ProbeFailure::Unexpected if probe.quiet => {
                        debug!("Database '{}': {source}", db.name());
                    }
                    ProbeFailure::Unexpected => warn!("Database '{}': {source}", db.name()),
                }
                status(
                    probe.quiet,
                    format_args!(
                        "Database '{}' does not yet exist or credentials are incorrect",
                        db.name()
                    ),
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Create the login user, the role if distinct, the database and its
    /// grants, skipping whatever already exists.
    pub fn provision(&self, db: &ConnectionDescriptor) -> Result<()> {
        if db.name().is_empty() {
            return Err(Error::Incomplete("name"));
        }
        if db.user().is_empty() {
            return Err(Error::Incomplete("user"));
        }

        self.connector
            .with_session(db, Target::Administrative, |session| {
                if create_if_missing(
                    session,
                    ObjectKind::Role,
                    db.user(),
                    sql::create_user(db.user(), db.password()),
                )? {
                    info!("User '{}' created", db.user());
                }

                if db.has_distinct_role() {
                    if create_if_missing(
                        session,
                        ObjectKind::Role,
                        db.role(),
                        sql::create_role(db.role()),
                    )? {
                        info!("Role '{}' created", db.role());
                    }
                    run(session, &sql::grant_role(db.role(), db.user()))?;
                }

                for statement in sql::role_defaults(db.role()) {
                    run(session, &statement)?;
                }

                if create_if_missing(
                    session,
                    ObjectKind::Database,
                    db.name(),
                    sql::create_database(db.name(), db.role()),
                )? {
                    info!("Database '{}' created", db.name());
                } else {
                    info!("Database '{}' already exists", db.name());
                }
                run(session, &sql::grant_all_on_database(db.name(), db.role()))?;
                Ok(())
            })
    }

    /// Drop the database, the user and, when distinct, the role. Objects that
    /// do not exist are skipped by the server.
    pub fn teardown(&self, db: &ConnectionDescriptor) -> Result<()> {
        self.connector
            .with_session(db, Target::Administrative, |session| {
                if !db.name().is_empty() {
                    run(session, &sql::drop_database(db.name()))?;
                    info!("Database '{}' dropped", db.name());
                }
                if !db.user().is_empty() {
                    run(session, &sql::drop_user(db.user()))?;
                }
                if db.has_distinct_role() {
                    run(session, &sql::drop_role(db.role()))?;
                }
                Ok(())
            })
    }

    /// Terminate every backend attached to the database and return how many
    /// were terminated. Does nothing for an empty name, which would otherwise
    /// target the administrative database.
    pub fn evict_connections(&self, db: &ConnectionDescriptor) -> Result<usize> {
        if db.name().is_empty() {
            debug!("No database name, not terminating any connections");
            return Ok(0);
        }
        let terminated = self
            .connector
            .with_session(db, Target::Administrative, |session| {
                run(session, &sql::terminate_connections(db.name()))
            })?;
        info!(
            "Terminated {terminated} connection(s) to database '{}'",
            db.name()
        );
        Ok(terminated)
    }

    /// Number of sessions attached to the database; `0` for an empty name.
    pub fn count_connections(&self, db: &ConnectionDescriptor) -> Result<i64> {
        if db.name().is_empty() {
            return Ok(0);
        }
        self.connector
            .with_session(db, Target::Administrative, |session| {
                count(session, &sql::count_connections(db.name()))
            })
    }
}
