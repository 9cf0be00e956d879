//! Plexus CLI library
//!
//! Demo reactors, configuration loading and the simulation driver behind the
//! `plexus` binary.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod reactors;

pub use app::{build_switch, run_simulation, RunOptions, SimulationReport};
pub use cli::{Cli, Commands, Mode};
pub use config::AppConfig;
pub use error::{CliError, Result};
pub use reactors::{CountingReactor, EchoReactor, COUNTER_CHANNEL, ECHO_CHANNEL};
