//! `DroplineServer` builder and server loop.
//!
//! This is the entry point for running a Dropline game server. It ties
//! together all the layers: transport → protocol → session → engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dropline_engine::GameEngine;
use dropline_protocol::{Codec, JsonCodec};
use dropline_session::SessionRegistry;
use dropline_transport::{Handshake, Transport, WebSocketTransport};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::handler::handle_connection;
use crate::{DroplineError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry synchronizes itself; nothing here needs an outer lock.
pub(crate) struct ServerState<E: GameEngine, C: Codec> {
    pub(crate) registry: Arc<SessionRegistry<E>>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
    /// Flipped to `true` once when the server begins shutting down.
    pub(crate) shutdown: watch::Sender<bool>,
}

/// Builder for configuring and starting a Dropline server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use dropline::prelude::*;
///
/// # async fn serve() -> Result<(), DroplineError> {
/// let server = DroplineServerBuilder::new()
///     .bind("127.0.0.1:8001")
///     .init_timeout(Some(Duration::from_secs(10)))
///     .build::<ConnectFour>()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DroplineServerBuilder {
    config: ServerConfig,
}

impl DroplineServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a connection may wait before sending `init`.
    pub fn init_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.init_timeout = timeout;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and builds a server whose games are played
    /// on fresh `E` engines.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// Returns [`DroplineError::Transport`] if the address can't be bound.
    pub async fn build<E: GameEngine>(
        self,
    ) -> Result<DroplineServer<E, JsonCodec>, DroplineError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let (shutdown, _) = watch::channel(false);

        let state = Arc::new(ServerState {
            registry: Arc::new(SessionRegistry::new()),
            codec: JsonCodec,
            config: self.config,
            shutdown,
        });

        Ok(DroplineServer { transport, state })
    }
}

impl Default for DroplineServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Dropline game server, created by [`DroplineServerBuilder`].
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct DroplineServer<E: GameEngine, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<E, C>>,
}

impl<E, C> DroplineServer<E, C>
where
    E: GameEngine,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the registry of live sessions.
    pub fn registry(&self) -> Arc<SessionRegistry<E>> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), DroplineError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `signal` completes, then shuts down.
    ///
    /// Shutdown stops accepting, tells every connection handler to close
    /// its connection, waits for the handlers to finish and finally ends
    /// every remaining session.
    pub async fn run_until(
        self,
        signal: impl Future<Output = ()>,
    ) -> Result<(), DroplineError> {
        let DroplineServer {
            mut transport,
            state,
        } = self;
        let mut handlers = JoinSet::new();
        tokio::pin!(signal);

        tracing::info!(
            addr = %state.config.bind_addr,
            "Dropline server running"
        );

        loop {
            tokio::select! {
                () = &mut signal => break,

                // Only the TCP accept runs here; the WebSocket upgrade
                // happens in the spawned task.
                accepted = transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&state);
                        handlers.spawn(async move {
                            let conn_id = pending.id();
                            if let Err(e) = handle_connection(pending, state).await {
                                tracing::debug!(
                                    %conn_id,
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },

                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    log_join(joined);
                }
            }
        }

        tracing::info!(
            connections = handlers.len(),
            "shutting down"
        );
        drop(transport);
        state.shutdown.send_replace(true);

        while let Some(joined) = handlers.join_next().await {
            log_join(joined);
        }

        let sessions = state.registry.drain();
        for session in &sessions {
            session.close().await;
        }
        tracing::info!(sessions = sessions.len(), "server stopped");
        Ok(())
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "connection handler panicked");
    }
}
