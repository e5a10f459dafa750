use crate::{CoercionPolicy, Error, Result};
use std::{borrow::Cow, env};

/// Connection url, coercion policy and log target of a `Database`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: Cow<'static, str>,
    pub coercion: CoercionPolicy,
    /// Target used by every log line the database emits.
    pub log_target: String,
}

impl Config {
    pub const URL_VAR: &'static str = "TABULA_DATABASE_URL";
    pub const COERCION_VAR: &'static str = "TABULA_COERCION";

    pub fn new(url: impl Into<Cow<'static, str>>) -> Self {
        Self {
            url: url.into(),
            coercion: CoercionPolicy::default(),
            log_target: "tabula".into(),
        }
    }

    /// Read `TABULA_DATABASE_URL` (required) and `TABULA_COERCION` (`strict` or `lenient`).
    pub fn from_env() -> Result<Self> {
        let url = env::var(Self::URL_VAR)
            .map_err(|_| Error::invalid_input(Self::URL_VAR, "a database url in the environment"))?;
        let mut config = Self::new(url);
        if let Ok(coercion) = env::var(Self::COERCION_VAR) {
            config.coercion = parse_coercion(&coercion)?;
        }
        Ok(config)
    }

    pub fn coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn lenient(self) -> Self {
        self.coercion(CoercionPolicy::Lenient)
    }

    pub fn log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    /// Database name: last path segment of the url, without query string.
    pub fn database_name(&self) -> &str {
        let url = self.url.split(['?', '#']).next().unwrap_or_default();
        let url = url.trim_end_matches('/');
        let (_, path) = url.split_once("://").unwrap_or(("", url));
        match path.rsplit_once('/') {
            Some((_, name)) => name,
            None => path,
        }
    }
}

fn parse_coercion(value: &str) -> Result<CoercionPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(CoercionPolicy::Strict),
        "lenient" => Ok(CoercionPolicy::Lenient),
        _ => Err(Error::invalid_input(value, "strict or lenient")),
    }
}
