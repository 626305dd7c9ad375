//! Store access port traits.

use crate::domain::error::StoreError;
use crate::domain::query::{Query, TableRef};
use crate::domain::raw_row::RawRow;
use std::fmt;
use std::time::Duration;

/// An open connection to the backing store. Executes one read per call.
pub trait StorePort: Send {
    fn fetch(&self, table: &TableRef, query: &Query) -> Result<Vec<RawRow>, StoreError>;
}

/// Where and how to connect. The key is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub url: String,
    pub key: String,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Opens connections on demand. Called at most once per client instance.
pub trait ConnectionFactory: Send {
    fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn StorePort>, StoreError>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&ConnectionTarget) -> Result<Box<dyn StorePort>, StoreError> + Send,
{
    fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn StorePort>, StoreError> {
        self(target)
    }
}
