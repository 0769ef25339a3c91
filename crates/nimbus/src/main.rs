//! Nimbus - a weather assistant for your terminal

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;
mod transcript;

use commands::{chat_command, init_command, setup_command, status_command};

/// Nimbus - ask about the weather in plain language
#[derive(Parser)]
#[command(name = "nimbus")]
#[command(about = "A weather assistant for your terminal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and data directory
    Init,
    /// Interactive setup of API keys
    Setup,
    /// Show configuration status
    Status,
    /// Chat with the weather assistant
    Chat {
        /// Send one message and exit
        #[arg(short, long)]
        message: Option<String>,
        /// Conversation thread id
        #[arg(short, long)]
        thread: Option<String>,
        /// Write the conversation to this file on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Setup => setup_command().await,
        Commands::Status => status_command().await,
        Commands::Chat {
            message,
            thread,
            transcript,
        } => chat_command(message, thread, transcript).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
