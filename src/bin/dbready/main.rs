//! dbready
//!
//! Reports whether a PostgreSQL server accepts connections, optionally waiting
//! for it, and whether the configured database exists.
//!
//! Exit status: `0` ready, `1` server unavailable, `2` database missing
//! (with `--database`).
//!
//! ```bash
//! dbready --wait --timeout 60 --database
//! ```

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use pgsetup::db::config::EnvContext;
use pgsetup::db::connection::Connector;
use pgsetup::{Resolver, logging};
use tracing::{error, info};

use crate::commands::handle_ready;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let env = EnvContext::from_process(cli.prefix.as_deref());
    let db = Resolver::new(env.clone()).resolve(&cli.overrides(), cli.url.as_deref());
    if cli.verbose > 0 {
        info!("DATABASE_URL={db}");
    }

    handle_ready(Connector::postgres(env), &db, &cli).unwrap_or_else(|e| {
        error!("Error: {e}");
        ExitCode::FAILURE
    })
}
