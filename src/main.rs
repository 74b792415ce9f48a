use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use tokio::signal;

use memedex::cli::commands::{
    handle_config, handle_index, handle_search, handle_status, handle_suggest,
};
use memedex::cli::{Cli, Commands};
use memedex::models::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();
    let format = cli.format.unwrap_or(config.search.default_format);
    let verbose = cli.verbose;

    // First signal requests a graceful stop at the next page boundary;
    // a second one aborts outright.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            eprintln!("\nStop requested; finishing current page (interrupt again to abort)");
            stop.store(true, Ordering::Relaxed);
            shutdown_signal().await;
            std::process::exit(130);
        });
    }

    run_command(cli.command, format, verbose, stop).await
}

async fn run_command(
    command: Commands,
    format: memedex::models::OutputFormat,
    verbose: bool,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    match command {
        Commands::Status => {
            handle_status(format, verbose).await?;
        }
        Commands::Index(args) => {
            handle_index(args, format, verbose, stop).await?;
        }
        Commands::Search(args) => {
            handle_search(args, format, verbose).await?;
        }
        Commands::Suggest(args) => {
            handle_suggest(args, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, format, verbose).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
