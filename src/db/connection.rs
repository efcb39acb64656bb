//! Database connection management.
//!
//! A [`Connector`] turns a descriptor into a live [`Session`], either against
//! the target database itself or against the administrative url in
//! `SA_DATABASE_URL`. The transport sits behind the [`Driver`] trait;
//! [`PgDriver`] is the diesel implementation.

use std::fmt::Display;

use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Text};
use diesel::{Connection, PgConnection, QueryableByName, RunQueryDsl};
use tracing::debug;

use crate::db::config::{DATABASE_URL, EnvContext, SA_DATABASE_URL};
use crate::db::descriptor::ConnectionDescriptor;
use crate::prelude::*;

/// Which server identity a connection is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Superuser credentials from `SA_DATABASE_URL`.
    Administrative,
    /// The descriptor's own credentials and database.
    Database,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// When false the session starts inside an open transaction.
    pub autocommit: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { autocommit: true }
    }
}

/// A SQL statement with text parameters bound as `$1`, `$2`, ...
#[derive(Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<String>,
    display: Option<String>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            display: None,
        }
    }

    pub fn bind(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Text shown in logs and errors instead of the real SQL.
    pub fn displayed_as(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display.as_deref().unwrap_or(&self.sql))
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.to_string())
            .field("params", &self.params)
            .finish()
    }
}

/// An open connection. Dropping it closes the connection.
pub trait Session {
    /// Run a statement, returning the affected or returned row count.
    fn execute(&mut self, statement: &Statement) -> diesel::QueryResult<usize>;

    /// Run a statement selecting a single `count` column.
    fn count(&mut self, statement: &Statement) -> diesel::QueryResult<i64>;
}

/// Opens sessions from connection urls.
pub trait Driver {
    type Session: Session;

    fn open(&self, dsn: &str, options: &ConnectOptions) -> ConnectionResult<Self::Session>;
}

pub type ConnectionResult<T> = core::result::Result<T, diesel::ConnectionError>;

/// Diesel's synchronous PostgreSQL connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDriver;

pub struct PgSession {
    conn: PgConnection,
}

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

impl PgSession {
    fn query(statement: &Statement) -> BoxedSqlQuery<'_, Pg, SqlQuery> {
        statement
            .params()
            .iter()
            .fold(diesel::sql_query(statement.sql()).into_boxed(), |query, param| {
                query.bind::<Text, _>(param.as_str())
            })
    }
}

impl Session for PgSession {
    fn execute(&mut self, statement: &Statement) -> diesel::QueryResult<usize> {
        Self::query(statement).execute(&mut self.conn)
    }

    fn count(&mut self, statement: &Statement) -> diesel::QueryResult<i64> {
        let row: Count = Self::query(statement).get_result(&mut self.conn)?;
        Ok(row.count)
    }
}

impl Driver for PgDriver {
    type Session = PgSession;

    fn open(&self, dsn: &str, options: &ConnectOptions) -> ConnectionResult<PgSession> {
        let mut conn = PgConnection::establish(dsn)?;
        if !options.autocommit {
            diesel::sql_query("BEGIN")
                .execute(&mut conn)
                .map_err(diesel::ConnectionError::CouldntSetupConfiguration)?;
        }
        Ok(PgSession { conn })
    }
}

/// Resolves the url for a [`Target`] and opens sessions through a [`Driver`].
#[derive(Debug, Clone)]
pub struct Connector<D> {
    driver: D,
    env: EnvContext,
    options: ConnectOptions,
}

impl Connector<PgDriver> {
    /// PostgreSQL connector reading `SA_DATABASE_URL` through `env`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pgsetup::db::config::EnvContext;
    /// use pgsetup::db::connection::{Connector, Target};
    /// use pgsetup::db::resolver::{Overrides, Resolver};
    ///
    /// let env = EnvContext::from_process(None);
    /// let db = Resolver::new(env.clone()).resolve(&Overrides::default(), None);
    /// let connector = Connector::postgres(env);
    /// let session = connector.connect(&db, Target::Database).unwrap();
    /// ```
    pub fn postgres(env: EnvContext) -> Self {
        Self::new(PgDriver, env)
    }
}

impl<D: Driver> Connector<D> {
    pub fn new(driver: D, env: EnvContext) -> Self {
        Self {
            driver,
            env,
            options: ConnectOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    /// The url a session for `target` would use.
    ///
    /// The administrative url comes only from `SA_DATABASE_URL`; the target
    /// url is the descriptor's own and counts as unresolved when it carries
    /// neither host nor user.
    pub fn dsn(&self, db: &ConnectionDescriptor, target: Target) -> Result<String> {
        match target {
            Target::Administrative => self
                .env
                .get_non_empty(SA_DATABASE_URL)
                .ok_or_else(|| Error::Configuration(SA_DATABASE_URL.to_string())),
            Target::Database if db.host().is_empty() && db.user().is_empty() => {
                Err(Error::Configuration(DATABASE_URL.to_string()))
            }
            Target::Database => Ok(db.url()),
        }
    }

    /// Open a session. The caller owns it and closes it by dropping it.
    pub fn connect(&self, db: &ConnectionDescriptor, target: Target) -> Result<D::Session> {
        let dsn = self.dsn(db, target)?;
        let label = redact_dsn(&dsn);
        debug!("Connecting to {label}");
        self.driver
            .open(&dsn, &self.options)
            .map_err(|source| Error::Connection {
                target: label,
                source,
            })
    }

    /// Run `f` on a fresh session, closing it on every exit path.
    pub fn with_session<T>(
        &self,
        db: &ConnectionDescriptor,
        target: Target,
        f: impl FnOnce(&mut D::Session) -> Result<T>,
    ) -> Result<T> {
        let mut session = self.connect(db, target)?;
        let result = f(&mut session);
        drop(session);
        debug!("Closed {target:?} connection");
        result
    }
}

/// Mask the password of a url for logging. Unparsable input is hidden entirely.
pub fn redact_dsn(dsn: &str) -> String {
    match dsn.parse::<ConnectionDescriptor>() {
        Ok(db) => db.to_string(),
        Err(_) => "REDACTED".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::config::StaticEnv;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingDriver {
        opened: Rc<RefCell<Vec<(String, bool)>>>,
    }

    struct NullSession;

    impl Session for NullSession {
        fn execute(&mut self, _: &Statement) -> diesel::QueryResult<usize> {
            Ok(0)
        }
        fn count(&mut self, _: &Statement) -> diesel::QueryResult<i64> {
            Ok(0)
        }
    }

    impl Driver for RecordingDriver {
        type Session = NullSession;

        fn open(&self, dsn: &str, options: &ConnectOptions) -> ConnectionResult<NullSession> {
            self.opened
                .borrow_mut()
                .push((dsn.to_string(), options.autocommit));
            Ok(NullSession)
        }
    }

    fn descriptor() -> ConnectionDescriptor {
        "postgresql://app:pw@db:5432/app".parse().unwrap()
    }

    #[test]
    fn administrative_url_comes_from_environment() {
        let env = EnvContext::new(
            StaticEnv::new([(SA_DATABASE_URL, "postgresql://postgres:root@db:5432/postgres")]),
            None,
        );
        let connector = Connector::new(RecordingDriver::default(), env);
        assert_eq!(
            connector.dsn(&descriptor(), Target::Administrative).unwrap(),
            "postgresql://postgres:root@db:5432/postgres"
        );
        assert_eq!(
            connector.dsn(&descriptor(), Target::Database).unwrap(),
            "postgresql://app:pw@db:5432/app"
        );
    }

    #[test]
    fn missing_administrative_url_is_a_configuration_error() {
        let connector = Connector::new(
            RecordingDriver::default(),
            EnvContext::new(StaticEnv::default(), None),
        );
        let err = connector
            .connect(&descriptor(), Target::Administrative)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration(ref key) if key == SA_DATABASE_URL));
    }

    #[test]
    fn empty_descriptor_is_a_configuration_error() {
        let connector = Connector::new(
            RecordingDriver::default(),
            EnvContext::new(StaticEnv::default(), None),
        );
        let empty: ConnectionDescriptor = "postgresql:///".parse().unwrap();
        assert!(matches!(
            connector.dsn(&empty, Target::Database),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn sessions_default_to_autocommit() {
        let driver = RecordingDriver::default();
        let connector = Connector::new(driver.clone(), EnvContext::new(StaticEnv::default(), None));
        connector
            .with_session(&descriptor(), Target::Database, |_| Ok(()))
            .unwrap();
        let connector = connector.with_options(ConnectOptions { autocommit: false });
        connector.connect(&descriptor(), Target::Database).unwrap();
        assert_eq!(
            *driver.opened.borrow(),
            vec![
                ("postgresql://app:pw@db:5432/app".to_string(), true),
                ("postgresql://app:pw@db:5432/app".to_string(), false),
            ]
        );
    }

    #[test]
    fn redacts_passwords() {
        assert_eq!(
            redact_dsn("postgresql://postgres:root@db:5432/postgres"),
            "postgresql://postgres:********@db:5432/postgres"
        );
        assert_eq!(redact_dsn("::garbage::"), "REDACTED");
    }

    #[test]
    fn statement_display_hides_sql() {
        let statement = Statement::new("CREATE USER x PASSWORD 'secret'")
            .displayed_as("CREATE USER x PASSWORD '********'");
        assert_eq!(statement.to_string(), "CREATE USER x PASSWORD '********'");
        assert!(!format!("{statement:?}").contains("secret"));
    }
}
