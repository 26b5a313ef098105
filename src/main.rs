//! # REST Dispatch - Entry Point
//! src/main.rs
//!
//! Arranca el servidor con la configuración de CLI / entorno y lo detiene
//! al recibir SIGINT o SIGTERM.

use std::process;
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rest_dispatch::config::ServerConfig;
use rest_dispatch::error::ServerError;
use rest_dispatch::metrics::MetricsCollector;
use rest_dispatch::resources::{EchoResource, StatusResource};
use rest_dispatch::router::RouteTable;
use rest_dispatch::server::Server;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rest_dispatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("rest-dispatch v{} starting", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_args();
    config.log_summary();

    if let Err(e) = run(config) {
        tracing::error!(error = %e, "Fatal error");
        process::exit(1);
    }
}

fn run(config: ServerConfig) -> Result<(), ServerError> {
    let metrics = Arc::new(MetricsCollector::new());

    let table = RouteTable::builder(config.base_url())
        .register(Arc::new(StatusResource::new(Arc::clone(&metrics))))?
        .register(Arc::new(EchoResource))?
        .build();

    // Registradas antes del start
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    let mut server = Server::with_metrics(config, table, metrics)?;
    server.start()?;

    tracing::info!("Press Ctrl+C to stop");
    wait_for_shutdown(&mut signals);

    server.stop();

    let snapshot = server.snapshot();
    tracing::info!(
        success = snapshot.success,
        failure = snapshot.failure,
        requests = snapshot.requests,
        "Final metrics"
    );
    Ok(())
}

/// Bloquea hasta recibir SIGINT o SIGTERM; no depende de stdin
fn wait_for_shutdown(signals: &mut Signals) -> Option<i32> {
    let signal = signals.forever().next();
    if let Some(signal) = signal {
        tracing::info!(signal, "Shutdown signal received");
    }
    signal
}
