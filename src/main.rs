//! EmberKV - An In-Memory Key-Value Server Speaking RESP
//!
//! This is the main entry point for the EmberKV server.
//! It parses flags, sets up logging and runs the TCP server until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use emberkv::{Config, Server};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV Server
#[derive(Parser, Debug)]
#[command(name = "emberkv")]
#[command(about = "In-memory key-value server speaking the Redis protocol")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = emberkv::DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = emberkv::DEFAULT_PORT)]
    port: u16,

    /// Largest accepted bulk string, in bytes
    #[arg(long, default_value_t = 512 * 1024 * 1024)]
    max_bulk_len: usize,

    /// Unsent reply bytes per connection above which reading pauses
    #[arg(long, default_value_t = 1024 * 1024)]
    output_high_water: usize,

    /// Base interval of the expiry sweeper, in milliseconds
    #[arg(long, default_value_t = 100)]
    sweep_interval_ms: u64,

    /// Expired keys removed per shard per sweep
    #[arg(long, default_value_t = 20)]
    sweep_batch: usize,
}

impl Args {
    fn into_config(self) -> Config {
        Config::builder()
            .host(self.host)
            .port(self.port)
            .max_bulk_len(self.max_bulk_len)
            .output_high_water(self.output_high_water)
            .sweep_interval(Duration::from_millis(self.sweep_interval_ms.max(1)))
            .sweep_batch(self.sweep_batch)
            .build()
    }
}

fn print_banner(config: &Config) {
    println!(
        r#"
EmberKV v{} - In-Memory Key-Value Server
──────────────────────────────────────────────
Listening on {}
Connect with any Redis client, e.g. redis-cli -p {}

Use Ctrl+C to shutdown gracefully.
"#,
        emberkv::VERSION,
        config.bind_address(),
        config.port,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let config = args.into_config();
    let server = Server::bind(config.clone())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;

    print_banner(&config);
    info!(version = emberkv::VERSION, "EmberKV starting");

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    server.run(shutdown).await.context("server failed")?;
    Ok(())
}
