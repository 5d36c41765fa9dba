// SPDX-License-Identifier: MIT

//! `swarmctl`: HTTP client for the `swarmd` Coordinator. `swarmd` itself only serves; this binary is the
//! operator's window into it.

mod client;
mod color;
mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};

use client::SwarmClient;
use commands::control::ControlActionArg;
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "swarmctl", version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")), about = "Build-swarm control-plane client")]
struct Cli {
    /// Coordinator base URL.
    #[arg(long, global = true, env = "SWARM_COORDINATOR_URL", default_value = "http://127.0.0.1:8100")]
    url: String,
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Snapshot of the active session and queue counts.
    Status,
    /// List registered drones and sweepers.
    Fleet {
        /// Include offline nodes.
        #[arg(long)]
        all: bool,
    },
    /// Recent build completions.
    History {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        session: Option<String>,
    },
    /// Queue management.
    Queue {
        #[command(subcommand)]
        action: QueueCommand,
    },
    /// Poll `status` on an interval until Ctrl-C.
    Monitor {
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
    /// Send a control action to the coordinator.
    Control {
        action: ControlActionArg,
        /// Drone id, only meaningful for `unground`.
        target: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum QueueCommand {
    /// Queue one or more package atoms onto the active session.
    Add { atoms: Vec<String> },
    /// List needed/delegated/blocked packages.
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = SwarmClient::new(cli.url);

    let result = match cli.command {
        Command::Status => commands::status::run(&client, cli.output).await,
        Command::Fleet { all } => commands::fleet::run(&client, all, cli.output).await,
        Command::History { limit, session } => commands::history::run(&client, limit, session, cli.output).await,
        Command::Queue { action } => match action {
            QueueCommand::Add { atoms } => commands::queue::add(&client, atoms, cli.output).await,
            QueueCommand::List => commands::queue::list(&client, cli.output).await,
        },
        Command::Monitor { interval } => commands::monitor::run(&client, interval, cli.output).await,
        Command::Control { action, target } => commands::control::run(&client, action, target, cli.output).await,
    };

    if let Err(err) = result {
        report(err);
    }
}

fn report(err: ExitError) {
    eprintln!("swarmctl: {}", color::error(&err.message));
    std::process::exit(err.code);
}
