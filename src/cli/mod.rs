//! CLI module for treexlate
//!
//! One request per invocation against the bundled reference model:
//! - get: read a subtree, with depth/content/fields filters
//! - create, update, replace, delete: write through the engine
//! - plan: dry-run a write and print its row mutations

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, PlanOperation, WriteArgs};
pub use commands::{execute, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{failure, read_payload, success, write_error, write_response};
