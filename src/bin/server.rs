//! DrawVault Server Binary
//!
//! Starts the TCP server for DrawVault.

use clap::Parser;
use drawvault::{Config, Server, DEFAULT_PORT};
use tracing_subscriber::{fmt, EnvFilter};

/// DrawVault Server
#[derive(Parser, Debug)]
#[command(name = "drawvault-server")]
#[command(about = "Repository server for drawing files")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Storage directory
    #[arg(short, long, default_value = "xml")]
    storage_dir: String,

    /// Worker threads (maximum concurrent connections)
    #[arg(short, long, default_value = "16")]
    workers: usize,

    /// Connections allowed to wait for a free worker
    #[arg(short = 'q', long, default_value = "64")]
    max_pending: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,drawvault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("DrawVault Server v{}", drawvault::VERSION);
    tracing::info!("Storage directory: {}", args.storage_dir);

    let config = Config::builder()
        .storage_dir(&args.storage_dir)
        .listen_addr(listen_addr(&args.host, args.port))
        .workers(args.workers)
        .max_pending(args.max_pending)
        .build();

    // Bind failure is fatal, no retry
    let server = match Server::open(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Join host and port, bracketing bare IPv6 literals
fn listen_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
