//! TCP server: accepts clients and spawns one connection task per client.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::{ExpirySweeper, StorageEngine};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How long open connections get to flush their replies on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A bound, not yet running server.
pub struct Server {
    listener: TcpListener,
    config: Config,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Binds the listener described by `config`.
    pub async fn bind(config: Config) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;

        Ok(Self {
            listener,
            config,
            storage: Arc::new(StorageEngine::new()),
            stats: Arc::new(ConnectionStats::new()),
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The keyspace served by this server.
    pub fn storage(&self) -> Arc<StorageEngine> {
        Arc::clone(&self.storage)
    }

    /// Connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Serves clients until `shutdown` resolves.
    ///
    /// On shutdown the listener stops accepting, every open session is moved
    /// to `Closing` and the server waits (up to a grace period) for them to
    /// flush and finish.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        let Self {
            listener,
            config,
            storage,
            stats,
        } = self;

        info!(
            addr = %listener.local_addr()?,
            shards = storage.shard_count(),
            "Server listening"
        );

        let _sweeper = ExpirySweeper::start(Arc::clone(&storage), config.expiry.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session_config = config.session();
        let mut connections = JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                        }

                        let handler = CommandHandler::new(Arc::clone(&storage), Arc::clone(&stats));
                        connections.spawn(handle_connection(
                            stream,
                            addr,
                            handler,
                            session_config,
                            Arc::clone(&stats),
                            shutdown_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }

        drop(listener);
        let _ = shutdown_tx.send(true);

        let open = connections.len();
        if open > 0 {
            info!(connections = open, "Waiting for open connections to close");
        }
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                connections = connections.len(),
                "Grace period elapsed, aborting remaining connections"
            );
            connections.shutdown().await;
        }

        info!("Server shutdown complete");
        Ok(())
    }
}
