//! Connect Four over WebSockets.
//!
//! Serves games until SIGINT or SIGTERM, then closes every connection and
//! exits.

use std::process::ExitCode;

use clap::Parser;
use dropline::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on
    #[arg(short = 'H', long, env = "DROPLINE_HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Seconds a new connection may stay silent before sending init
    /// (0 waits forever)
    #[arg(long, default_value = "30")]
    init_timeout: u64,
    /// Log filter, e.g. `info` or `dropline=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_filter).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?}: {e}; using \"info\"", args.log_filter);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let init_timeout = (args.init_timeout > 0)
        .then(|| std::time::Duration::from_secs(args.init_timeout));
    let server = match DroplineServerBuilder::new()
        .bind(&format!("{}:{}", args.host, args.port))
        .init_timeout(init_timeout)
        .build::<ConnectFour>()
        .await
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            return ExitCode::FAILURE;
        }
    };

    match server.local_addr() {
        Ok(addr) => tracing::info!(%addr, "listening"),
        Err(e) => tracing::warn!(error = %e, "listening on unknown address"),
    }

    match server.run_until(wait_for_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C elsewhere).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                    _ = sigint.recv() => tracing::info!("received SIGINT"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "cannot register signal handlers, falling back to Ctrl+C");
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for Ctrl+C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
