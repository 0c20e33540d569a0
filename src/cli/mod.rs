//! Command line support for the `schema-graph` binary

pub mod commands;
pub mod error;

pub use error::CliError;
