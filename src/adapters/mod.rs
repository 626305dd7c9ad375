//! Concrete adapter implementations for ports.

#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "rest")]
pub mod rest_adapter;
#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub mod sql;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;

use crate::domain::error::StoreError;
use crate::ports::store_port::{ConnectionFactory, ConnectionTarget, StorePort};

/// Which transport a connection URL selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Rest,
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn for_url(url: &str) -> Option<Backend> {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("https://") || lower.starts_with("http://") {
            Some(Backend::Rest)
        } else if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Backend::Postgres)
        } else if lower.starts_with("sqlite://") || lower.starts_with("file:") {
            Some(Backend::Sqlite)
        } else {
            None
        }
    }
}

/// Opens a connection with whichever compiled-in adapter matches the URL scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnectionFactory;

impl ConnectionFactory for DefaultConnectionFactory {
    fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn StorePort>, StoreError> {
        let unsupported = || StoreError::UnsupportedUrl {
            url: target.url.clone(),
        };

        match Backend::for_url(&target.url).ok_or_else(unsupported)? {
            #[cfg(feature = "rest")]
            Backend::Rest => Ok(Box::new(rest_adapter::RestAdapter::connect(target)?)),
            #[cfg(feature = "postgres")]
            Backend::Postgres => Ok(Box::new(postgres_adapter::PostgresAdapter::connect(target)?)),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => Ok(Box::new(sqlite_adapter::SqliteAdapter::connect(target)?)),
            #[allow(unreachable_patterns)]
            _ => Err(unsupported()),
        }
    }
}
