//! investing-cache: read-only access to precomputed daily stock indicators.
//!
//! Hexagonal architecture: domain types in [`domain`], port traits in [`ports`],
//! concrete transports in [`adapters`]. [`client::IndicatorClient`] is the entry
//! point.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod settings;
pub mod client;
pub mod cli;
pub mod logging;

pub use client::{IndicatorClient, TopScores};
pub use domain::error::{CacheError, ErrorKind};
pub use domain::record::{IndicatorRecord, ScoreField};
pub use settings::ClientSettings;
