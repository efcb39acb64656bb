//! PostgreSQL database provisioning.
//!
//! Resolves connection settings from layered sources (defaults, prefixed
//! environment variables, a connection url and explicit overrides) and runs
//! idempotent lifecycle operations against the server: existence probe,
//! creation of the database and its owning role, teardown, and termination of
//! open sessions.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pgsetup::db::config::EnvContext;
//! use pgsetup::db::connection::Connector;
//! use pgsetup::db::resolver::{Overrides, Resolver};
//! use pgsetup::lifecycle::{Lifecycle, Probe};
//!
//! let env = EnvContext::from_process(None);
//! let db = Resolver::new(env.clone()).resolve(&Overrides::default(), None);
//! let lifecycle = Lifecycle::new(Connector::postgres(env));
//!
//! if !lifecycle.exists(&db, Probe::default()).unwrap() {
//!     lifecycle.provision(&db).unwrap();
//! }
//! ```

pub mod db;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod prelude;
pub mod readiness;

pub use db::descriptor::ConnectionDescriptor;
pub use db::resolver::{Overrides, Resolver};
pub use lifecycle::{Lifecycle, Probe};
