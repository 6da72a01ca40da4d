//! CLI argument definitions using clap
//!
//! Commands:
//! - profiledb init
//! - profiledb get | put | delete
//! - profiledb field get | values | exists | set | add | delete
//! - profiledb search
//! - profiledb list
//!
//! Every command takes `--config <path>`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::store::{ItemRef, TenantId};

/// profiledb - path-addressed item profiles
#[derive(Parser, Debug)]
#[command(name = "profiledb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./profiledb.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Which item a command addresses
#[derive(Args, Debug, Clone)]
pub struct ItemArgs {
    /// Tenant id
    #[arg(long)]
    pub tenant: TenantId,

    /// Item type name, as configured in `item_types`
    #[arg(long = "type")]
    pub item_type: String,

    /// Internal item id
    #[arg(long, conflicts_with = "external", required_unless_present = "external")]
    pub item: Option<u32>,

    /// External item id, as configured in `external_ids`
    #[arg(long)]
    pub external: Option<String>,
}

impl ItemArgs {
    pub fn item_ref(&self) -> ItemRef {
        match (&self.item, &self.external) {
            (Some(id), _) => ItemRef::Internal(*id),
            (None, Some(external)) => ItemRef::External(external.clone()),
            // clap enforces one of the two
            (None, None) => ItemRef::External(String::new()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init,

    /// Print the stored profile text
    Get {
        #[command(flatten)]
        item: ItemArgs,
    },

    /// Store profile text read from a file or stdin
    Put {
        #[command(flatten)]
        item: ItemArgs,

        /// Read the profile from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete a whole profile
    Delete {
        #[command(flatten)]
        item: ItemArgs,
    },

    /// Read or write a single profile field
    Field {
        #[command(subcommand)]
        action: FieldAction,
    },

    /// Find items whose profile holds a value at a path
    Search {
        #[arg(long)]
        tenant: TenantId,

        #[arg(long = "type")]
        item_type: String,

        /// Field path, e.g. /profile/genre
        #[arg(long)]
        path: String,

        #[arg(long)]
        value: String,
    },

    /// List items of a type that have a profile
    List {
        #[arg(long)]
        tenant: TenantId,

        #[arg(long = "type")]
        item_type: String,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum FieldAction {
    /// Value of a single-valued field
    Get {
        #[command(flatten)]
        item: ItemArgs,
        path: String,
    },

    /// All values of a repeatable field
    Values {
        #[command(flatten)]
        item: ItemArgs,
        path: String,
    },

    /// Whether a field (or `field[text()='v']`) exists
    Exists {
        #[command(flatten)]
        item: ItemArgs,
        path: String,
    },

    /// Set a single-valued field
    Set {
        #[command(flatten)]
        item: ItemArgs,
        path: String,
        value: String,
    },

    /// Add values to a repeatable field
    Add {
        #[command(flatten)]
        item: ItemArgs,
        path: String,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove a field with all its values
    Delete {
        #[command(flatten)]
        item: ItemArgs,
        path: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
