//! CLI argument definitions using clap
//!
//! Commands:
//! - treexlate get <path> [--depth N] [--content C] [--fields F]...
//! - treexlate create|update|replace <path> --payload <json|@file>
//! - treexlate delete <path>
//! - treexlate plan <operation> <path> [--payload <json|@file>]

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::transformer::Operation;

/// treexlate - translate tree-shaped requests into table rows
#[derive(Parser, Debug)]
#[command(name = "treexlate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to engine configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON dump of the store; written back after a successful write
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the subtree at a path
    Get {
        path: String,

        /// Levels to return, target included; "unbounded" or 0 for all
        #[arg(long)]
        depth: Option<String>,

        /// all, config, nonconfig or operational
        #[arg(long)]
        content: Option<String>,

        /// Relative paths to return; repeatable, or `;` separated
        #[arg(long)]
        fields: Vec<String>,
    },

    /// Create data at a path; fails if the target already exists
    Create(WriteArgs),

    /// Merge data at a path
    Update(WriteArgs),

    /// Replace the data at a path
    Replace(WriteArgs),

    /// Delete the data at a path
    Delete { path: String },

    /// Show the row mutations a request would make, without committing
    Plan {
        #[arg(value_enum)]
        operation: PlanOperation,

        path: String,

        #[arg(long)]
        payload: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    pub path: String,

    /// Inline JSON, or @file to read it from a file
    #[arg(long)]
    pub payload: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOperation {
    Create,
    Update,
    Replace,
    Delete,
}

impl From<PlanOperation> for Operation {
    fn from(op: PlanOperation) -> Self {
        match op {
            PlanOperation::Create => Operation::Create,
            PlanOperation::Update => Operation::Update,
            PlanOperation::Replace => Operation::Replace,
            PlanOperation::Delete => Operation::Delete,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
