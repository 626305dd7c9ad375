//! Core domain types: records, raw rows, queries and errors.

pub mod error;
pub mod query;
pub mod raw_row;
pub mod record;
