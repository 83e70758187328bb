//! Cipherpost server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port
//! cipherpost-server
//!
//! # Report users offline after 30s without polling
//! cipherpost-server --bind 127.0.0.1:50051 --presence-timeout-secs 30
//! ```

use std::time::Duration;

use cipherpost_proto::DEFAULT_MAX_FRAME_SIZE;
use cipherpost_server::{
    DEFAULT_BIND_ADDRESS, DEFAULT_IDLE_TIMEOUT, DirectoryConfig, Server, ServerRuntimeConfig,
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Cipherpost directory and relay server
#[derive(Parser, Debug)]
#[command(name = "cipherpost-server")]
#[command(about = "Cipherpost directory and relay server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = DEFAULT_BIND_ADDRESS)]
    bind: String,

    /// Report users offline after this many seconds without polling
    #[arg(long)]
    presence_timeout_secs: Option<u64>,

    /// Close connections idle for this many seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    idle_timeout_secs: u64,

    /// Largest accepted frame body, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Cipherpost server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        directory: DirectoryConfig {
            presence_timeout: args.presence_timeout_secs.map(Duration::from_secs),
        },
        max_frame_size: args.max_frame_size,
        idle_timeout: (args.idle_timeout_secs > 0).then(|| Duration::from_secs(args.idle_timeout_secs)),
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
