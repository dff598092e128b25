//! Edge router
//!
//! Hosts the route dispatcher behind an HTTP listener and forwards every
//! request to the origin its route selects.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 EDGE ROUTER                  │
//!   Admin API / config   │  ┌───────────┐          ┌────────────────┐   │
//!   ─────────────────────┼─▶│ registrar │─────────▶│ key-value store│   │
//!                        │  └───────────┘          └───────┬────────┘   │
//!                        │                                 │ read       │
//!   Client Request       │  ┌───────────┐          ┌───────▼────────┐   │
//!   ─────────────────────┼─▶│   http    │─────────▶│   dispatcher   │   │
//!                        │  │  server   │          │ match + origin │   │
//!                        │  └───────────┘          └───────┬────────┘   │
//!                        │                                 │            │
//!   Client Response      │  ┌───────────┐                  │            │
//!   ◀────────────────────┼──│ forwarder │◀─────────────────┘            │──▶ Origin
//!                        │  └───────────┘                               │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use edge_router::admin::{setup_admin_router, AdminState};
use edge_router::config::{load_config, ConfigError, ProxyConfig};
use edge_router::config::watcher::ConfigWatcher;
use edge_router::edge::{Dispatcher, EdgeSettings};
use edge_router::http::HttpServer;
use edge_router::lifecycle::shutdown::save_on_exit;
use edge_router::lifecycle::{signals, startup, Shutdown};
use edge_router::net::load_tls_config;
use edge_router::observability::{logging, metrics};
use edge_router::routing::Registrar;
use edge_router::store::{KvStore, MemoryStore};

#[derive(Parser)]
#[command(name = "edge-router", version, about = "Dynamic edge request router")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, from_file) = match load_config(&args.config) {
        Ok(config) => (config, true),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => (ProxyConfig::default(), false),
        Err(e) => return Err(e.into()),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-router starting");
    if !from_file {
        tracing::warn!(path = ?args.config, "Config file not found, using defaults");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Store and control plane
    let memory = MemoryStore::from_config(&config.store)?;
    let store: Arc<dyn KvStore> = Arc::new(memory.clone());
    let registrar = Arc::new(Registrar::new(store.clone(), config.app.clone(), config.router.clone()));
    let seeded = startup::seed_routes(&registrar, &config).await?;

    tracing::info!(
        router = %config.router.name,
        namespace = %registrar.namespace(),
        inline = registrar.is_inline(),
        routes = seeded,
        "Router ready"
    );

    let dispatcher = Arc::new(Dispatcher::new(
        store,
        registrar.namespace(),
        EdgeSettings::from_config(&config),
    ));

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(shutdown.clone());

    // Hot reload: declared routes and edge settings
    let _watcher = if from_file {
        let (watcher, mut updates) = ConfigWatcher::new(&args.config);
        let handle = watcher.run()?;
        let registrar = registrar.clone();
        let dispatcher = dispatcher.clone();
        let mut current = config.routes.clone();
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(next) = updates.recv() => {
                        startup::reconcile_routes(&registrar, &current, &next.routes).await;
                        dispatcher.update_settings(EdgeSettings::from_config(&next));
                        current = next.routes;
                    }
                    _ = stop.recv() => break,
                }
            }
        });
        Some(handle)
    } else {
        None
    };

    // Admin API
    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let app = setup_admin_router(AdminState::new(registrar.clone(), &config.admin.api_key));
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    // Edge listener
    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, dispatcher)?;
    let served: Result<(), Box<dyn std::error::Error>> = match tls {
        Some(tls) => match load_tls_config(&tls).await {
            Ok(rustls) => server.run_tls(rustls, shutdown.subscribe()).await.map_err(Into::into),
            Err(e) => Err(e.into()),
        },
        None => match TcpListener::bind(&bind_address).await {
            Ok(listener) => server.run(listener, shutdown.subscribe()).await.map_err(Into::into),
            Err(e) => Err(e.into()),
        },
    };

    shutdown.trigger();
    save_on_exit(served, &memory)?;
    tracing::info!("Shutdown complete");
    Ok(())
}
