//! focusd -- single-session work/break timer daemon and client.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use focusd_core::StatusDuration;

mod client;
mod config;
mod proto;
mod server;

use client::Endpoint;
use config::Config;
use proto::Request;

#[derive(Parser)]
#[command(name = "focusd", version, about = "Single-session work/break timer daemon")]
struct Cli {
    /// Unix socket the daemon listens on.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// TCP address instead of a unix socket.
    #[arg(long, global = true)]
    tcp: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon
    Serve(ServeArgs),
    /// Report the controller status
    Status,
    /// Start the session, or resume a paused one
    Play,
    /// Freeze the running countdown
    Pause,
    /// Jump to the next phase immediately
    Skip,
    /// Reset the session to stopped
    Stop,
}

#[derive(Args)]
struct ServeArgs {
    /// Config file path (defaults to ~/.config/focusd/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Work period duration, e.g. "25m0s"
    #[arg(long)]
    work: Option<StatusDuration>,

    /// Short break duration, e.g. "5m0s"
    #[arg(long)]
    short_break: Option<StatusDuration>,

    /// Long break duration, e.g. "15m0s"
    #[arg(long)]
    long_break: Option<StatusDuration>,

    /// Completed work periods between long breaks
    #[arg(long)]
    work_sessions: Option<u32>,

    /// Command run on every controller event
    #[arg(long)]
    event_command: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Serve(args) => {
            init_tracing();
            let mut config = Config::load(args.config.as_deref())?;
            if let Some(socket) = cli.socket {
                config.socket = socket;
            }
            if let Some(tcp) = cli.tcp {
                config.tcp = Some(tcp);
            }
            if let Some(work) = args.work {
                config.schedule.work = work;
            }
            if let Some(short_break) = args.short_break {
                config.schedule.short_break = short_break;
            }
            if let Some(long_break) = args.long_break {
                config.schedule.long_break = long_break;
            }
            if let Some(work_sessions) = args.work_sessions {
                config.schedule.work_sessions = work_sessions;
            }
            if let Some(event_command) = args.event_command {
                config.hooks.event_command = Some(event_command);
            }
            server::serve(config).await
        }
        Commands::Status => client_action(cli.socket, cli.tcp, Request::Status).await,
        Commands::Play => client_action(cli.socket, cli.tcp, Request::Play).await,
        Commands::Pause => client_action(cli.socket, cli.tcp, Request::Pause).await,
        Commands::Skip => client_action(cli.socket, cli.tcp, Request::Skip).await,
        Commands::Stop => client_action(cli.socket, cli.tcp, Request::Stop).await,
    }
}

async fn client_action(
    socket: Option<PathBuf>,
    tcp: Option<String>,
    request: Request,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = match (socket, tcp) {
        (_, Some(addr)) => Endpoint::Tcp(addr),
        (Some(path), None) => Endpoint::Unix(path),
        (None, None) => {
            let config = Config::load(None)?;
            match config.tcp {
                Some(addr) => Endpoint::Tcp(addr),
                None => Endpoint::Unix(config.socket),
            }
        }
    };
    let status = client::call(&endpoint, request).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
