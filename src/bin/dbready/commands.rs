use std::process::ExitCode;

use pgsetup::db::connection::{Connector, Driver};
use pgsetup::prelude::*;
use pgsetup::readiness::{WaitOptions, wait_for_server};
use pgsetup::{ConnectionDescriptor, Lifecycle, Probe};
use tracing::{debug, info};

use crate::cli::Cli;

const UNAVAILABLE: u8 = 1;
const DATABASE_ABSENT: u8 = 2;

pub fn handle_ready<D: Driver>(
    connector: Connector<D>,
    db: &ConnectionDescriptor,
    cli: &Cli,
) -> Result<ExitCode> {
    let options = WaitOptions {
        wait: cli.wait,
        timeout: cli.timeout(),
        interval: cli.sleep,
    };

    let readiness = wait_for_server(&connector, db, &options)?;
    if !readiness.is_ready() {
        info!("Database is NOT available for connections");
        return Ok(ExitCode::from(UNAVAILABLE));
    }
    debug!("{readiness:?}");

    if cli.database {
        let probe = Probe {
            strict: false,
            quiet: cli.quiet,
        };
        if !Lifecycle::new(connector).exists(db, probe)? {
            return Ok(ExitCode::from(DATABASE_ABSENT));
        }
        info!("Database '{}' exists and credentials are correct", db.name());
    } else if cli.verbose > 0 {
        info!("Database is available and accepting connections");
    }
    Ok(ExitCode::SUCCESS)
}
