//! CLI argument definitions using clap
//!
//! Commands:
//! - entity-gateway dispatch --config <path> [--request <path>]
//! - entity-gateway serve --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Entity Gateway - request dispatch over in-memory entity storage
#[derive(Parser, Debug)]
#[command(name = "entity-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Handle a single request and exit
    Dispatch {
        /// Path to configuration file
        #[arg(long, default_value = "./gateway.json")]
        config: PathBuf,

        /// Read the request from this file instead of stdin
        #[arg(long)]
        request: Option<PathBuf>,
    },

    /// Handle JSON-lines requests from stdin until EOF
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./gateway.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
