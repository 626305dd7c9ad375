//! Port traits: the seams between the client and its backends.

pub mod config_port;
pub mod store_port;
