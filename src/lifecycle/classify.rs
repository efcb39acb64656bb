//! Classification of driver errors.
//!
//! Only the exact conditions listed here are tolerated; anything else is
//! propagated by the caller.

use diesel::ConnectionError;
use diesel::result::{DatabaseErrorKind, Error as QueryError};

/// Catalog object kinds that provisioning creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Users and roles share one namespace on the server.
    Role,
    Database,
}

impl ObjectKind {
    fn noun(self) -> &'static str {
        match self {
            ObjectKind::Role => "role",
            ObjectKind::Database => "database",
        }
    }
}

/// Whether `err` is the server reporting that `name` already exists.
pub fn is_duplicate(err: &QueryError, kind: ObjectKind, name: &str) -> bool {
    match err {
        QueryError::DatabaseError(DatabaseErrorKind::Unknown, info) => {
            info.message() == format!("{} \"{}\" already exists", kind.noun(), name)
        }
        _ => false,
    }
}

/// Outcome of a failed existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Database, role or credentials not provisioned yet.
    Absent,
    /// Anything else: network, server or configuration faults.
    Unexpected,
}

const ABSENCE: &[&str] = &[
    "does not exist",
    "password authentication failed",
    "no password supplied",
];

const TRANSPORT: &[&str] = &[
    "Connection refused",
    "connection is bad",
    "could not translate host name",
    "server closed the connection unexpectedly",
    "the database system is starting up",
    "the database system is shutting down",
    "No such file or directory",
    "Network is unreachable",
    "No route to host",
    "timeout expired",
];

fn mentions(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| message.contains(marker))
}

pub fn classify_probe(err: &ConnectionError) -> ProbeFailure {
    match err {
        ConnectionError::BadConnection(message) if mentions(message, ABSENCE) => {
            ProbeFailure::Absent
        }
        _ => ProbeFailure::Unexpected,
    }
}

/// Whether the server could not be reached at all, as opposed to answering
/// with a refusal.
pub fn is_transport_failure(err: &ConnectionError) -> bool {
    match err {
        ConnectionError::BadConnection(message) => mentions(message, TRANSPORT),
        _ => false,
    }
}
