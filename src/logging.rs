//! Logger setup for the binary.
//!
//! The library only emits through the `log` facade; installing a logger is
//! left to whoever owns `main`.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Level used when neither `RUST_LOG` nor `-v` says otherwise.
pub const DEFAULT_FILTER: &str = "warn";

/// Maps repeated `-v` flags onto a level. Zero keeps the environment filter.
pub fn verbosity_filter(verbose: u8) -> Option<LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

/// Installs `env_logger` on stderr, honouring `RUST_LOG`. Calling it twice is
/// harmless; the second call is ignored.
pub fn init(verbose: u8) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    if let Some(level) = verbosity_filter(verbose) {
        builder.filter_level(level);
    }

    if builder.format_timestamp_millis().try_init().is_ok() {
        log::debug!("logging initialised");
    }
}
