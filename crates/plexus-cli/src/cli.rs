//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect in-memory peers and push messages through the reactors
    Run {
        /// Number of peers to connect
        #[arg(short, long, default_value_t = 4)]
        peers: usize,
        /// Messages each peer delivers to the counting reactor
        #[arg(short, long, default_value_t = 1000)]
        messages: u64,
        /// Delivery mode of the counting reactor (overrides the configuration file)
        #[arg(long, value_enum)]
        mode: Option<Mode>,
        /// Receive queue capacity of the counting reactor; implies asynchronous mode
        #[arg(long)]
        capacity: Option<usize>,
    },
    /// Print the channel table of the demo reactors
    Channels,
}

/// Delivery mode selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Sync,
    Async,
}
