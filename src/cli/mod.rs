//! diskmemo command line interface.

pub mod commands;
pub mod interactive;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// diskmemo - disk-backed memoization for commands and code.
#[derive(Parser, Debug)]
#[command(name = "diskmemo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "diskmemo.toml")]
    pub config: PathBuf,

    /// Verbose mode.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode.
    #[arg(short, long)]
    pub quiet: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Writes a default configuration in the current directory.
    Init {
        /// Target directory (default: current directory).
        #[arg(short, long, conflicts_with = "user")]
        path: Option<PathBuf>,

        /// Write the per-user config, caching into the user cache directory.
        #[arg(long)]
        user: bool,
    },

    /// Runs a program through the disk cache and prints its stdout.
    Exec {
        /// Namespace of the cache key.
        #[arg(short, long, default_value = "diskmemo.exec")]
        namespace: String,

        /// Always run the program (the result is still saved).
        #[arg(long)]
        force: bool,

        /// Serve a stored result whatever its age.
        #[arg(long)]
        ignore_expiration: bool,

        /// Bypass the cache entirely.
        #[arg(long)]
        no_cache: bool,

        /// TTL in seconds, overriding the config.
        #[arg(long)]
        ttl: Option<f64>,

        /// Print the decision log to stderr.
        #[arg(long)]
        show_log: bool,

        /// Program and arguments.
        #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Shows the cache policy and what is on disk.
    Status,

    /// Decodes the header of an entry file.
    Inspect {
        /// Entry file.
        file: PathBuf,
    },

    /// Deletes expired and corrupted entries.
    Prune {
        /// Delete every entry.
        #[arg(long)]
        all: bool,
    },

    /// Edits the configuration interactively.
    Config,

    /// Shows the version.
    Version,
}
