//! Main Crate Error

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required connection url could not be resolved from the environment.
    #[error("Environment not configured: {0} is not set")]
    Configuration(String),

    /// The server rejected or never answered a connection attempt.
    #[error("Couldn't connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: diesel::ConnectionError,
    },

    /// An administrative statement failed for a reason other than the
    /// idempotent `already exists` / `does not exist` cases.
    #[error("Statement `{statement}` failed: {source}")]
    Statement {
        statement: String,
        #[source]
        source: diesel::result::Error,
    },

    #[error("Database {0} is required for this operation")]
    Incomplete(&'static str),

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
