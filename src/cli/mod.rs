//! CLI module for profiledb
//!
//! One-shot commands over a local data directory:
//! - init: create the data directory
//! - get / put / delete: whole profiles
//! - field: path-addressed field reads and writes
//! - search / list: reverse lookups

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, FieldAction, ItemArgs};
pub use commands::{execute, init, run, run_command};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_profile_text, write_error, write_response};
