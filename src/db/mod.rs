//! Connection settings and connections.

pub mod config;
pub mod connection;
pub mod descriptor;
pub mod dsn;
#[cfg(test)]
pub(crate) mod fake;
pub mod resolver;
