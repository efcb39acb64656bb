//! Environment configuration management.
//!
//! Every lookup goes through an [`EnvContext`], which carries the optional
//! variable prefix. With prefix `FOO` a lookup of `DBHOST` reads `FOO_DBHOST`
//! first and falls back to `DBHOST` only when the prefixed variable is absent.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

pub const DBHOST: &str = "DBHOST";
pub const DBPORT: &str = "DBPORT";
pub const DBNAME: &str = "DBNAME";
pub const DBUSER: &str = "DBUSER";
pub const DBROLE: &str = "DBROLE";
pub const DBPASS: &str = "DBPASS";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DJANGO_DATABASE_URL: &str = "DJANGO_DATABASE_URL";
pub const SA_DATABASE_URL: &str = "SA_DATABASE_URL";
pub const ENVPREFIX: &str = "ENVPREFIX";

/// A source of environment variables.
///
/// `None` means the variable is absent, which is distinct from a variable set
/// to the empty string.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of variables, used where the process environment must not leak in.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Prefix-aware view of an [`EnvSource`].
///
/// The prefix is fixed at construction; switching prefixes means building a
/// new context.
#[derive(Clone)]
pub struct EnvContext {
    prefix: Option<String>,
    source: Arc<dyn EnvSource>,
}

impl EnvContext {
    pub fn new(source: impl EnvSource + 'static, prefix: Option<&str>) -> Self {
        let prefix = prefix
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_uppercase);
        Self {
            prefix,
            source: Arc::new(source),
        }
    }

    /// Context over the process environment.
    ///
    /// An explicit prefix wins; otherwise `ENVPREFIX` selects one.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pgsetup::db::config::EnvContext;
    ///
    /// let env = EnvContext::from_process(Some("site"));
    /// assert_eq!(env.prefix(), Some("SITE"));
    /// ```
    pub fn from_process(prefix: Option<&str>) -> Self {
        let detected = ProcessEnv.var(ENVPREFIX);
        Self::new(ProcessEnv, prefix.or(detected.as_deref()))
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Look a key up, prefixed variable first.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(prefix) = &self.prefix {
            if let Some(value) = self.source.var(&format!("{prefix}_{key}")) {
                return Some(value);
            }
        }
        self.source.var(key)
    }

    /// Like [`EnvContext::get`] but treats an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty())
    }
}

impl std::fmt::Debug for EnvContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvContext")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Display for EnvContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "env[{prefix}_*]"),
            None => write!(f, "env"),
        }
    }
}
