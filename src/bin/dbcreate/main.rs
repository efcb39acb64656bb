//! dbcreate
//!
//! Creates, removes or tests a PostgreSQL database together with the login
//! user and owning role that go with it. Every action is safe to repeat.
//!
//! ```bash
//! # create from DATABASE_URL, using SA_DATABASE_URL for superuser access
//! dbcreate --create
//!
//! # drop a test database, terminating open sessions first
//! dbcreate --remove --kill -N shop_test
//!
//! # exit status tells whether the database exists
//! dbcreate --test -e STAGING
//! ```

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use pgsetup::db::config::EnvContext;
use pgsetup::db::connection::Connector;
use pgsetup::{Lifecycle, Overrides, Resolver, logging};
use tracing::{error, info};

use crate::commands::{handle_create, handle_remove, handle_test};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose, false);

    let env = EnvContext::from_process(cli.connection.prefix.as_deref());
    let db = Resolver::new(env.clone()).resolve(
        &Overrides::from(&cli.connection),
        cli.connection.url.as_deref(),
    );
    if cli.verbose > 0 {
        info!("DATABASE_URL={db}");
    }

    let lifecycle = Lifecycle::new(Connector::postgres(env));
    let result = if cli.test {
        handle_test(&lifecycle, &db)
    } else if cli.remove {
        handle_remove(&lifecycle, &db, cli.kill)
    } else {
        handle_create(&lifecycle, &db, &cli)
    };

    result.unwrap_or_else(|e| {
        error!("Error: {e}");
        ExitCode::FAILURE
    })
}
