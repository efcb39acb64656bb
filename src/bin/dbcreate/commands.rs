use std::process::ExitCode;

use clap::CommandFactory;
use pgsetup::db::connection::Driver;
use pgsetup::prelude::*;
use pgsetup::{ConnectionDescriptor, Lifecycle, Probe};
use tracing::{error, info, warn};

use crate::cli::{Cli, OnExisting};

pub fn handle_test<D: Driver>(
    lifecycle: &Lifecycle<D>,
    db: &ConnectionDescriptor,
) -> Result<ExitCode> {
    if lifecycle.exists(db, Probe::default())? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

pub fn handle_remove<D: Driver>(
    lifecycle: &Lifecycle<D>,
    db: &ConnectionDescriptor,
    kill: bool,
) -> Result<ExitCode> {
    if kill {
        lifecycle.evict_connections(db)?;
    }
    lifecycle.teardown(db)?;
    Ok(ExitCode::SUCCESS)
}

pub fn handle_create<D: Driver>(
    lifecycle: &Lifecycle<D>,
    db: &ConnectionDescriptor,
    cli: &Cli,
) -> Result<ExitCode> {
    let probe = Probe {
        strict: false,
        quiet: cli.verbose == 0,
    };
    let exists = lifecycle.exists(db, probe)?;

    match (exists, cli.create, cli.on_existing) {
        (true, true, OnExisting::Fail) => {
            error!("Database {} already exists", db.name());
            Ok(ExitCode::FAILURE)
        }
        (true, true, OnExisting::Provision) => {
            info!("Database {} already exists, provisioning again", db.name());
            lifecycle.provision(db)?;
            Ok(ExitCode::SUCCESS)
        }
        (true, _, _) => {
            warn!("Database {} already exists", db.name());
            Ok(ExitCode::SUCCESS)
        }
        (false, true, _) => {
            lifecycle.provision(db)?;
            Ok(ExitCode::SUCCESS)
        }
        (false, false, _) => {
            Cli::command().print_help()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
