// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - resilient client-side event delivery.
//!
//! This is the binary entry point: it runs the delivery services and offers
//! a few maintenance commands for the persisted order queue.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier_config::CourierConfig;

/// Courier - resilient client-side event delivery.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the submission queue, realtime client and telemetry logger.
    Run,
    /// Inspect or repair the persisted order queue.
    Queue {
        #[command(subcommand)]
        action: QueueCommand,
    },
    /// Validate or print the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum QueueCommand {
    /// Print every persisted order.
    List,
    /// Return a failed order to pending and run one drain pass over the queue.
    ///
    /// Refused while `courier run` owns the queue.
    Retry {
        /// Client-generated id of the order (a UUID, as shown by `queue list`).
        client_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate configuration and report problems.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

fn load_config(path: Option<&std::path::Path>) -> CourierConfig {
    let loaded = match path {
        Some(path) => courier_config::load_and_validate_path(path),
        None => courier_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Run) => {
            serve::init_tracing(&config.agent.log_level);
            serve::run(config).await
        }
        Some(Commands::Queue { action }) => {
            serve::init_tracing("warn");
            match action {
                QueueCommand::List => commands::queue_list(&config).await,
                QueueCommand::Retry { client_id } => {
                    commands::queue_retry(&config, &client_id).await
                }
            }
        }
        Some(Commands::Config { action }) => match action {
            ConfigCommand::Check => {
                println!("courier: configuration is valid");
                Ok(())
            }
            ConfigCommand::Show => commands::config_show(&config),
        },
        None => {
            println!("courier: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
