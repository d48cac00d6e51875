//! Command line interface module
//!
//! Argument parsing and the runner that executes the `list` and `delete`
//! subcommands against a registry.

pub mod args;
pub mod runner;

pub use args::{Args, Command, parse_reference};
pub use runner::Runner;
