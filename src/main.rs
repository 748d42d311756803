//! flintkv server entry point
//!
//! Sets up logging, loads the snapshot if one exists, binds the TCP
//! listener and spawns one handler task per accepted connection.

use flintkv::commands::{CommandTable, Executor};
use flintkv::connection::{handle_connection, ConnectionStats};
use flintkv::persistence::Persistence;
use flintkv::pubsub::PubSub;
use flintkv::storage::Keyspace;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Snapshot file path
    snapshot: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: flintkv::DEFAULT_HOST.to_string(),
            port: flintkv::DEFAULT_PORT,
            snapshot: flintkv::DEFAULT_SNAPSHOT_PATH.to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--snapshot" | "-s" => {
                    if i + 1 < args.len() {
                        config.snapshot = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --snapshot requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("flintkv version {}", flintkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
flintkv - An In-Memory, Redis-Protocol Data Store

USAGE:
    flintkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>        Port to listen on (default: 8000)
    -s, --snapshot <PATH>    Snapshot file path (default: flintkv.json)
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    flintkv                          # Start on 127.0.0.1:8000
    flintkv --port 6380              # Start on port 6380
    flintkv --host 0.0.0.0           # Listen on all interfaces
    flintkv --snapshot /var/db.json  # Snapshot to a custom path

CONNECTING:
    Use redis-cli or any Redis client to connect:
    $ redis-cli -p 8000
    127.0.0.1:8000> PING
    PONG
    127.0.0.1:8000> SET name flint
    OK
    127.0.0.1:8000> GET name
    "flint"
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Create the shared state
    let keyspace = Arc::new(Keyspace::new());
    let pubsub = Arc::new(PubSub::new());
    let persistence = Arc::new(Persistence::new(&config.snapshot));

    // Populate the keyspace from a previous snapshot, if any. A load
    // failure is an operator concern; the server starts empty.
    match persistence.load(&keyspace) {
        Ok(()) => info!(path = %config.snapshot, "Keyspace loaded"),
        Err(e) => warn!(error = %e, path = %config.snapshot, "Snapshot load failed, starting empty"),
    }

    let executor = Arc::new(Executor::new(
        Arc::clone(&keyspace),
        Arc::clone(&pubsub),
        Arc::clone(&persistence),
    ));
    let table = Arc::new(CommandTable::new());
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, table, executor, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    table: Arc<CommandTable>,
    executor: Arc<Executor>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let table = Arc::clone(&table);
                let executor = Arc::clone(&executor);
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, table, executor, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
