//! # Entity Gateway CLI
//!
//! Two commands:
//! - `dispatch` - handle one request and exit
//! - `serve` - handle JSON-lines requests from stdin until EOF
//!
//! Responses go to stdout, one JSON object per line. Logs go to stderr.

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_dispatcher, dispatch, run, run_command, serve, serve_lines};
pub use config::{GatewayConfig, UserConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::parse_request;
