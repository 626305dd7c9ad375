//! Error types for decoding, store access and the public client surface.

use chrono::NaiveDate;
use std::error::Error;

/// A raw row could not be decoded into an [`IndicatorRecord`](crate::domain::record::IndicatorRecord).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid date {value}: expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Failure raised by a store adapter while executing one query.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unsupported connection url: {url}")]
    UnsupportedUrl { url: String },

    #[error("{backend} error: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {reason}")]
    Payload { reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl StoreError {
    pub fn backend(backend: &'static str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        StoreError::Backend {
            backend,
            source: source.into(),
        }
    }
}

/// The three failure kinds every client operation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Connection,
}

/// Top-level error type for investing-cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("credentials not configured: {reason}")]
    Config { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigFile { file: String, reason: String },

    #[error("no data found in {table}")]
    NoData { table: String },

    #[error("ticker {symbol} not found for date {date}")]
    TickerNotFound { symbol: String, date: NaiveDate },

    #[error("{operation} failed{context}: {source}")]
    Connection {
        operation: &'static str,
        context: String,
        #[source]
        source: StoreError,
    },
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Config { .. } | CacheError::ConfigFile { .. } => ErrorKind::Configuration,
            CacheError::NoData { .. } | CacheError::TickerNotFound { .. } => ErrorKind::NotFound,
            CacheError::Connection { .. } => ErrorKind::Connection,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn connection(
        operation: &'static str,
        context: impl Into<String>,
        source: StoreError,
    ) -> Self {
        CacheError::Connection {
            operation,
            context: context.into(),
            source,
        }
    }
}

impl From<&CacheError> for std::process::ExitCode {
    fn from(err: &CacheError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Configuration => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::Connection => 4,
        };
        std::process::ExitCode::from(code)
    }
}
