//! Plexus CLI entry point

use anyhow::Context;
use clap::Parser;
use tracing::info;

use plexus_cli::{
    app::{build_switch, run_simulation, RunOptions},
    cli::{Cli, Commands},
    config::AppConfig,
    error::Result,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_configuration(&cli).context("failed to load configuration")?;

    match cli.command {
        Commands::Run {
            peers,
            messages,
            mode,
            capacity,
        } => {
            let reactor = config.reactor_with(mode, capacity)?;
            let report = run_simulation(
                &config,
                RunOptions {
                    peers,
                    messages,
                    reactor,
                },
            )
            .await?;
            println!("{report}");
            if !report.is_clean() {
                anyhow::bail!("simulation finished with lost or reordered messages");
            }
        }
        Commands::Channels => {
            let (switch, _, _) = build_switch(&config, config.reactor.clone())?;
            println!(
                "{:<10} {:<8} {:>8} {:>10} {:>12} {:>12}",
                "REACTOR", "CHANNEL", "PRIORITY", "SEND QUEUE", "RECV BUFFER", "MAX MESSAGE"
            );
            for (owner, descriptor) in switch.channel_descriptors() {
                println!(
                    "{:<10} {:<8} {:>8} {:>10} {:>12} {:>12}",
                    owner,
                    descriptor.id.to_string(),
                    descriptor.priority,
                    descriptor.send_queue_capacity,
                    descriptor.recv_buffer_capacity,
                    descriptor.recv_message_capacity
                );
            }
        }
    }

    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path);
        AppConfig::load_from_file(config_path)
    } else {
        info!("Using default configuration");
        Ok(AppConfig::default())
    }
}
