//! Administrative statements.
//!
//! DDL cannot take bind parameters, so identifiers and the password literal
//! are quoted here. Catalog lookups bind their values.

use crate::db::connection::Statement;

/// Double-quote an identifier, doubling embedded quotes.
pub fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn role_exists(role: &str) -> Statement {
    Statement::new("SELECT COUNT(*) AS count FROM pg_catalog.pg_roles WHERE rolname = $1")
        .bind(role)
}

pub fn database_exists(name: &str) -> Statement {
    Statement::new("SELECT COUNT(*) AS count FROM pg_catalog.pg_database WHERE datname = $1")
        .bind(name)
}

pub fn create_user(user: &str, password: &str) -> Statement {
    let head = format!("CREATE USER {} CREATEDB INHERIT PASSWORD", ident(user));
    Statement::new(format!("{head} {}", literal(password)))
        .displayed_as(format!("{head} '********'"))
}

pub fn create_role(role: &str) -> Statement {
    Statement::new(format!("CREATE ROLE {}", ident(role)))
}

pub fn grant_role(role: &str, user: &str) -> Statement {
    Statement::new(format!("GRANT {} TO {}", ident(role), ident(user)))
}

/// Session defaults applied to the owning role.
pub fn role_defaults(role: &str) -> [Statement; 3] {
    let role = ident(role);
    [
        Statement::new(format!("ALTER ROLE {role} SET client_encoding TO 'utf8'")),
        Statement::new(format!(
            "ALTER ROLE {role} SET default_transaction_isolation TO 'read committed'"
        )),
        Statement::new(format!("ALTER ROLE {role} SET timezone TO 'UTC'")),
    ]
}

pub fn create_database(name: &str, owner: &str) -> Statement {
    Statement::new(format!(
        "CREATE DATABASE {} WITH OWNER {}",
        ident(name),
        ident(owner)
    ))
}

pub fn grant_all_on_database(name: &str, role: &str) -> Statement {
    Statement::new(format!(
        "GRANT ALL PRIVILEGES ON DATABASE {} TO {}",
        ident(name),
        ident(role)
    ))
}

pub fn drop_database(name: &str) -> Statement {
    Statement::new(format!("DROP DATABASE IF EXISTS {}", ident(name)))
}

pub fn drop_user(user: &str) -> Statement {
    Statement::new(format!("DROP USER IF EXISTS {}", ident(user)))
}

pub fn drop_role(role: &str) -> Statement {
    Statement::new(format!("DROP ROLE IF EXISTS {}", ident(role)))
}

pub fn count_connections(name: &str) -> Statement {
    Statement::new(
        "SELECT COUNT(*) AS count FROM pg_catalog.pg_stat_activity WHERE datname = $1",
    )
    .bind(name)
}

/// Terminate every other backend attached to `name`.
pub fn terminate_connections(name: &str) -> Statement {
    Statement::new(
        "SELECT pg_terminate_backend(pid) FROM pg_catalog.pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(name)
}
