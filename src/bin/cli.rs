//! DrawVault CLI Client
//!
//! Command-line interface for a DrawVault server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drawvault::{Client, ClientConfig, DEFAULT_PORT};
use tracing_subscriber::{fmt, EnvFilter};

/// DrawVault CLI
#[derive(Parser, Debug)]
#[command(name = "drawvault-cli")]
#[command(about = "CLI for the DrawVault drawing repository")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1")]
    address: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Response timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List drawings stored on the server
    List,

    /// Download a drawing
    Fetch {
        /// Name of the drawing on the server
        name: String,

        /// Local destination (defaults to the drawing's name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a drawing
    Upload {
        /// Local file to send
        local: PathBuf,

        /// Name to store it under on the server
        remote: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .addr(server_addr(&args.address, args.port))
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .build();
    let client = Client::with_config(config);

    if let Err(e) = run(&client, args.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(client: &Client, command: Commands) -> drawvault::Result<()> {
    match command {
        Commands::List => {
            for name in client.list_files()? {
                println!("{}", name);
            }
        }
        Commands::Fetch { name, output } => {
            let path = match output {
                Some(dest) => client.fetch_file(&name, dest)?,
                None => client.fetch_to_cwd(&name)?,
            };
            println!("{}", path.display());
        }
        Commands::Upload { local, remote } => {
            client.upload_file(&local, &remote)?;
            println!("Uploaded {} as {}", local.display(), remote);
        }
    }
    Ok(())
}

fn server_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
