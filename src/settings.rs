//! Connection settings for [`IndicatorClient`](crate::client::IndicatorClient).
//!
//! URL and key come from explicit values when given and non-empty, otherwise
//! from `SUPABASE_URL` / `SUPABASE_ANON_KEY`. An INI file section `[supabase]`
//! may sit between the two.

use crate::domain::error::CacheError;
use crate::domain::query::TableRef;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::ConnectionTarget;
use std::fmt;
use std::time::Duration;

pub const URL_ENV: &str = "SUPABASE_URL";
pub const KEY_ENV: &str = "SUPABASE_ANON_KEY";
pub const DEFAULT_SCHEMA: &str = "investing_one";
pub const DEFAULT_TABLE: &str = "daily_indicators";
pub const CONFIG_SECTION: &str = "supabase";

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Clone, PartialEq)]
pub struct ClientSettings {
    pub url: Option<String>,
    pub key: Option<String>,
    pub schema: String,
    pub table: String,
    pub timeout: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
            timeout: None,
        }
    }
}

impl ClientSettings {
    /// Explicit values win; missing ones are read from the process environment.
    pub fn new(url: Option<&str>, key: Option<&str>) -> Self {
        Self::resolve(url, key, env_lookup)
    }

    pub fn from_env() -> Self {
        Self::new(None, None)
    }

    /// Like [`ClientSettings::new`] with a custom variable lookup.
    pub fn resolve(
        url: Option<&str>,
        key: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            url: non_empty(url.map(str::to_string)).or_else(|| non_empty(lookup(URL_ENV))),
            key: non_empty(key.map(str::to_string)).or_else(|| non_empty(lookup(KEY_ENV))),
            ..Self::default()
        }
    }

    /// Reads `[supabase] url, key, schema, table, timeout_secs`; credentials
    /// absent from the file fall back to `lookup`.
    pub fn from_config(
        config: &dyn ConfigPort,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let url = config.get_string(CONFIG_SECTION, "url");
        let key = config.get_string(CONFIG_SECTION, "key");
        let mut settings = Self::resolve(url.as_deref(), key.as_deref(), lookup);

        if let Some(schema) = non_empty(config.get_string(CONFIG_SECTION, "schema")) {
            settings.schema = schema;
        }
        if let Some(table) = non_empty(config.get_string(CONFIG_SECTION, "table")) {
            settings.table = table;
        }
        let timeout_secs = config.get_int(CONFIG_SECTION, "timeout_secs", 0);
        if timeout_secs > 0 {
            settings.timeout = Some(Duration::from_secs(timeout_secs as u64));
        }
        settings
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_empty(Some(url.into())).or(self.url);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = non_empty(Some(key.into())).or(self.key);
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// True when both URL and key are present. Never touches the network.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.key.is_some()
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.table.clone())
    }

    pub fn target(&self) -> Result<ConnectionTarget, CacheError> {
        match (&self.url, &self.key) {
            (Some(url), Some(key)) => Ok(ConnectionTarget {
                url: url.clone(),
                key: key.clone(),
                timeout: self.timeout,
            }),
            (url, key) => {
                let missing: Vec<&str> = [(url.is_none(), URL_ENV), (key.is_none(), KEY_ENV)]
                    .into_iter()
                    .filter_map(|(absent, name)| absent.then_some(name))
                    .collect();
                Err(CacheError::Config {
                    reason: format!("set {}", missing.join(" and ")),
                })
            }
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("schema", &self.schema)
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .finish()
    }
}
