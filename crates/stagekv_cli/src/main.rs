//! stagekv CLI
//!
//! Command-line tools for a stagekv store directory.
//!
//! # Commands
//!
//! - `get`, `put`, `delete` - single autocommit operations
//! - `dump` - print the committed store
//! - `history` - print recorded durable applies
//! - `shell` - interactive session with nested transactions
//! - `serve-stdio` - JSON-lines request server on stdin/stdout

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// stagekv command-line tools.
#[derive(Parser)]
#[command(name = "stagekv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(
        global = true,
        short,
        long,
        env = "STAGEKV_DB_PATH",
        default_value = "./stagekv-data"
    )]
    path: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the committed value of a key
    Get {
        /// Key to read
        key: String,
    },

    /// Write a key (JSON value; anything else is stored as a string)
    Put {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
    },

    /// Delete a key
    Delete {
        /// Key to delete
        key: String,
    },

    /// Print every committed key and value
    Dump {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print recorded commits from the history file
    History {
        /// Show only the most recent N commits
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Interactive shell holding one session
    Shell,

    /// Serve JSON requests, one per line, on stdin/stdout
    ServeStdio {
        /// Serve dump_committed and commit_history
        #[arg(long)]
        debug_views: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output.
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Get { key } => commands::kv::get(&cli.path, &key)?,
        Commands::Put { key, value } => commands::kv::put(&cli.path, &key, &value)?,
        Commands::Delete { key } => commands::kv::delete(&cli.path, &key)?,
        Commands::Dump { format } => commands::dump::run(&cli.path, &format)?,
        Commands::History { limit, format } => commands::history::run(&cli.path, limit, &format)?,
        Commands::Shell => commands::shell::run(&cli.path)?,
        Commands::ServeStdio { debug_views } => commands::serve::run(&cli.path, debug_views)?,
        Commands::Version => {
            println!("stagekv CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("stagekv core v{}", stagekv_core::VERSION);
        }
    }

    Ok(())
}
