use pgsetup::db::config::{EnvContext, SA_DATABASE_URL, StaticEnv};
use pgsetup::db::connection::{Connector, PgDriver};
use pgsetup::{ConnectionDescriptor, Lifecycle, Overrides, Resolver};

use super::from_env;

pub const TEST_USER: &str = "pgsetup_test_user";
pub const TEST_PASSWORD: &str = "testing";

/// A throwaway database on the server behind `SA_DATABASE_URL`, torn down on drop.
pub struct DbTestContext {
    pub lifecycle: Lifecycle<PgDriver>,
    pub db: ConnectionDescriptor,
}

impl DbTestContext {
    pub fn new(admin_url: &str, name: &str, role: Option<&str>) -> Self {
        let env = EnvContext::new(StaticEnv::new([(SA_DATABASE_URL, admin_url)]), None);
        let overrides = Overrides {
            name: Some(name.to_string()),
            user: Some(TEST_USER.to_string()),
            role: Some(role.unwrap_or(TEST_USER).to_string()),
            password: Some(TEST_PASSWORD.to_string()),
            ..Overrides::default()
        };
        let db = Resolver::new(EnvContext::new(StaticEnv::default(), None))
            .resolve(&overrides, Some(admin_url));

        Self {
            lifecycle: Lifecycle::new(Connector::postgres(env)),
            db,
        }
    }

    /// `None` when no administrative url is configured.
    pub fn from_env(name: &str, role: Option<&str>) -> Option<Self> {
        let admin_url = from_env(SA_DATABASE_URL)?;
        Some(Self::new(&admin_url, name, role))
    }
}

impl Drop for DbTestContext {
    fn drop(&mut self) {
        let _ = self.lifecycle.evict_connections(&self.db);
        let _ = self.lifecycle.teardown(&self.db);
    }
}
