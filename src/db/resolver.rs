//! Layered resolution of a [`ConnectionDescriptor`].
//!
//! Sources are folded left to right and the last present value for a field
//! wins. The role is settled inside the layers: the environment defaults it to
//! `DBUSER`, and a url user becomes the role too unless the role folded so far
//! is already distinct from the user.
//!
//!
//! 1. [`Defaults`]
//! 2. [`EnvironmentSource`] (`DBHOST`, `DBPORT`, ... through the prefix)
//! 3. [`UrlSource`] (explicit url, else `DATABASE_URL`, else `DJANGO_DATABASE_URL`)
//! 4. [`Overrides`] supplied by the caller
//!
//! Resolution never fails. Fields nobody supplies stay empty and the failure
//! surfaces when a connection is attempted.

use tracing::{trace, warn};

use crate::db::config::{
    DATABASE_URL, DBHOST, DBNAME, DBPASS, DBPORT, DBROLE, DBUSER, DJANGO_DATABASE_URL, EnvContext,
};
use crate::db::descriptor::{ConnectionDescriptor, DEFAULT_SCHEME};
use crate::db::dsn;

/// A partial descriptor: what one source knows about each field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

impl Fields {
    /// Overlay `later` on `self`; present values in `later` win.
    pub fn merge(self, later: Fields) -> Fields {
        Fields {
            scheme: later.scheme.or(self.scheme),
            host: later.host.or(self.host),
            port: later.port.or(self.port),
            name: later.name.or(self.name),
            user: later.user.or(self.user),
            role: later.role.or(self.role),
            password: later.password.or(self.password),
        }
    }

    /// Move a `host:port` suffix into `port` when no port was given.
    fn split_embedded_port(mut self) -> Self {
        if self.port.is_none() {
            if let Some((host, port)) = self.host.as_deref().and_then(dsn::split_host_port) {
                self.host = Some(host);
                self.port = Some(port);
            }
        }
        self
    }
}

/// One configuration layer.
pub trait Source {
    fn name(&self) -> &'static str;
    fn fields(&self) -> Fields;

    /// Lay this source over what the earlier layers produced.
    fn apply(&self, folded: Fields) -> Fields {
        folded.merge(self.fields())
    }
}

/// Built-in values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Defaults;

impl Source for Defaults {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn fields(&self) -> Fields {
        Fields {
            scheme: Some(DEFAULT_SCHEME.to_string()),
            ..Fields::default()
        }
    }
}

/// `DBHOST`, `DBPORT`, `DBNAME`, `DBUSER`, `DBROLE` and `DBPASS`.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentSource<'a> {
    env: &'a EnvContext,
}

impl<'a> EnvironmentSource<'a> {
    pub fn new(env: &'a EnvContext) -> Self {
        Self { env }
    }

    fn port(&self) -> Option<u16> {
        let raw = self.env.get_non_empty(DBPORT)?;
        match raw.trim().parse() {
            Ok(port) => Some(port),
            Err(_) => {
                warn!("Ignoring {DBPORT}='{raw}': not a valid port");
                None
            }
        }
    }
}

impl Source for EnvironmentSource<'_> {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn fields(&self) -> Fields {
        Fields {
            scheme: None,
            host: self.env.get(DBHOST),
            port: self.port(),
            name: self.env.get(DBNAME),
            user: self.env.get(DBUSER),
            role: self
                .env
                .get_non_empty(DBROLE)
                .or_else(|| self.env.get_non_empty(DBUSER)),
            password: self.env.get(DBPASS),
        }
        .split_embedded_port()
    }
}

/// A connection url, explicit or taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct UrlSource {
    url: Option<String>,
}

impl UrlSource {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            url: url.filter(|u| !u.is_empty()).map(str::to_string),
        }
    }

    /// Use `url` when given, otherwise `DATABASE_URL` or its alias.
    pub fn from_env(url: Option<&str>, env: &EnvContext) -> Self {
        match url.filter(|u| !u.is_empty()) {
            Some(url) => Self::new(Some(url)),
            None => Self {
                url: env
                    .get_non_empty(DATABASE_URL)
                    .or_else(|| env.get_non_empty(DJANGO_DATABASE_URL)),
            },
        }
    }
}

impl Source for UrlSource {
    fn name(&self) -> &'static str {
        "url"
    }

    fn fields(&self) -> Fields {
        let Some(url) = &self.url else {
            return Fields::default();
        };
        match dsn::parse(url) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Ignoring unparsable connection url: {e}");
                Fields::default()
            }
        }
    }

    fn apply(&self, folded: Fields) -> Fields {
        let distinct = folded.role.is_some() && folded.role != folded.user;
        let mut fields = self.fields();
        if !distinct {
            fields.role = fields.user.clone();
        }
        folded.merge(fields)
    }
}

/// Values supplied explicitly by the caller. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

impl Source for Overrides {
    fn name(&self) -> &'static str {
        "overrides"
    }

    fn fields(&self) -> Fields {
        Fields {
            scheme: None,
            host: present(&self.host),
            port: self.port,
            name: present(&self.name),
            user: present(&self.user),
            role: present(&self.role),
            password: present(&self.password),
        }
        .split_embedded_port()
    }
}

/// Fold sources in order, later sources winning.
pub fn fold(sources: &[&dyn Source]) -> Fields {
    sources.iter().fold(Fields::default(), |acc, source| {
        trace!(source = source.name(), "Applying configuration layer");
        source.apply(acc)
    })
}

/// Builds descriptors from the standard layers.
#[derive(Debug, Clone)]
pub struct Resolver {
    env: EnvContext,
}

impl Resolver {
    pub fn new(env: EnvContext) -> Self {
        Self { env }
    }

    /// Resolve a descriptor from defaults, environment, url and `overrides`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pgsetup::db::config::{EnvContext, StaticEnv};
    /// use pgsetup::db::resolver::{Overrides, Resolver};
    ///
    /// let resolver = Resolver::new(EnvContext::new(StaticEnv::default(), None));
    /// let overrides = Overrides {
    ///     name: Some("shop_test".into()),
    ///     ..Overrides::default()
    /// };
    /// let db = resolver.resolve(&overrides, Some("postgresql://bob:pw@db.example:5432/shop"));
    /// assert_eq!(db.name(), "shop_test");
    /// assert_eq!(db.user(), "bob");
    /// ```
    pub fn resolve(&self, overrides: &Overrides, url: Option<&str>) -> ConnectionDescriptor {
        let environment = EnvironmentSource::new(&self.env);
        let url = UrlSource::from_env(url, &self.env);
        let fields = fold(&[&Defaults, &environment, &url, overrides]);
        ConnectionDescriptor::from_fields(fields)
    }
}
