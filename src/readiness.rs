//! Polling a server until it accepts connections.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::db::connection::{Connector, Driver, Target};
use crate::db::descriptor::ConnectionDescriptor;
use crate::lifecycle::classify::is_transport_failure;
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Keep retrying instead of giving up after one attempt.
    pub wait: bool,
    /// Give up once this much time has passed. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Pause between attempts.
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            wait: false,
            timeout: None,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    Unavailable { attempts: u32 },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// Connect to the server without selecting a database until it answers.
///
/// Any answer counts, including an authentication refusal: only transport
/// failures mean the server is not up yet. The deadline is checked between
/// attempts and never interrupts one in flight.
pub fn wait_for_server<D: Driver>(
    connector: &Connector<D>,
    db: &ConnectionDescriptor,
    options: &WaitOptions,
) -> Result<Readiness> {
    let server = db.with_name("");
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match connector.connect(&server, Target::Database) {
            Ok(session) => {
                drop(session);
                return Ok(Readiness::Ready { attempts });
            }
            Err(Error::Connection { source, .. }) if !is_transport_failure(&source) => {
                debug!("Server answered: {}", source.to_string().replace('\n', " "));
                return Ok(Readiness::Ready { attempts });
            }
            Err(Error::Connection { source, .. }) => {
                debug!("{}", source.to_string().replace('\n', " "));
            }
            Err(e) => return Err(e),
        }

        if !options.wait || deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(Readiness::Unavailable { attempts });
        }
        debug!("Database is not ready ({attempts})");
        thread::sleep(options.interval);
    }
}
