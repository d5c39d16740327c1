//! CLI definitions for uuidlens.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// uuidlens CLI.
#[derive(Parser)]
#[command(name = "uuidlens")]
#[command(about = "Detect and resolve entity UUIDs in console pages")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, env = "UUIDLENS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run one enhancement pass over a DOM snapshot
    Scan {
        /// JSON DOM snapshot exported from the page
        #[arg(long)]
        snapshot: PathBuf,

        /// Write the annotated markup to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the pass report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a single UUID
    Resolve {
        uuid: String,

        /// Entity type (tag, application, profile, script, product, organization-group)
        entity_type: String,
    },

    /// Validate the configuration file
    CheckConfig,
}
