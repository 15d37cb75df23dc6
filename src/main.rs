//! Shopping List Server
//!
//! A single-process server that keeps one shared shopping list in memory
//! and exposes create/read/update/delete/list operations over a
//! persistent WebSocket connection. Every change is pushed to all
//! connected clients.
//!
//! Usage:
//!   shopping-list                                  # Default port 5000
//!   shopping-list --port 8080                      # Custom port
//!   shopping-list --cors-origin http://localhost:3000
//!   shopping-list --verbose --log-file             # Debug logs to ~/.shopping-list/logs/server.log

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slist_server::ListServer;
use slist_services::{Schemas, ShoppingListService};
use slist_transport::{TransportConfig, TransportServer};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shopping-list", about = "Shopping list server over WebSocket")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "32")]
    max_connections: usize,

    /// Longest accepted item title, in characters
    #[arg(long, default_value = "50")]
    max_title_length: usize,

    /// Browser origin allowed to connect (enables CORS)
    #[arg(long)]
    cors_origin: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file (defaults to ~/.shopping-list/logs/server.log if no path given)
    #[arg(long, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let Some(log_file_arg) = cli.log_file.as_deref() else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(());
    };

    let log_path = if log_file_arg == "DEFAULT" {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".shopping-list/logs/server.log")
    } else {
        PathBuf::from(log_file_arg)
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    eprintln!("Logging to {}", log_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    // Shared notification channel for change events
    let (notification_tx, _) = broadcast::channel::<String>(1024);

    let service = ShoppingListService::new(Schemas::items(cli.max_title_length));
    let mut list_server = ListServer::new(service);
    list_server.set_notification_sender(notification_tx.clone());
    list_server.initialize();
    let list_server = Arc::new(list_server);

    let transport_config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        max_connections: Some(cli.max_connections),
        cors_origin: cli.cors_origin.clone(),
        verbose_logging: cli.verbose,
    };

    let mut transport =
        TransportServer::start_with_sender(transport_config, list_server.clone(), notification_tx)
            .await
            .context("starting transport")?;

    println!();
    println!("  Shopping list server running");
    println!("    ws://{}:{}/ws", cli.hostname, transport.port());
    if let Some(origin) = &cli.cors_origin {
        println!("    CORS origin: {origin}");
    }
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;

    info!("Shutting down");
    list_server.shutdown();
    transport.stop().await;

    Ok(())
}
