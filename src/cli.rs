use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keep a Hytale mods directory in sync with CurseForge.
#[derive(Debug, Parser)]
#[command(name = "modsync", version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), merged over the platform default.
    #[arg(long, short, global = true, env = "MODSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines instead of human readable text.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh the catalog on a schedule until interrupted.
    Serve,
    /// Run one refresh cycle and print its outcome.
    Refresh,
    /// Run one refresh cycle and print the cache status.
    Status,
    /// Search the remote catalog.
    Search { term: String },
    /// Print one page of the cached catalog.
    Catalog {
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Match every installed mod against the catalog.
    Match,
    /// Update one installed mod to its newest version.
    Update {
        /// File name inside the mods directory.
        file: String,
    },
}
