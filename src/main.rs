//! profiledb CLI entry point
//!
//! Parses arguments, dispatches the command and exits non-zero on failure.
//! All logic lives in the CLI module.

use profiledb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
