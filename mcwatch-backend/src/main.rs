use mcwatch_backend::config::Config;
use mcwatch_backend::poll::Tracker;
use mcwatch_backend::query::StatusPingClient;
use mcwatch_backend::scheduler::Scheduler;
use mcwatch_backend::{AppState, create_app};
use mcwatch_db::Database;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = "debug";
    #[cfg(not(debug_assertions))]
    let log_level = "info";

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting mcwatch...");

    // Load configuration from environment variables or use defaults
    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, db_path={}, interval={}s, query_timeout={}s, servers={}",
        config.port,
        config.database_path,
        config.poll_interval.as_secs(),
        config.query_timeout.as_secs(),
        config.servers.len()
    );
    if !config.prune.is_unbounded() {
        tracing::info!(
            "Presence pruning: max_age={:?}s, max_entries={:?}",
            config.prune.max_age,
            config.prune.max_entries
        );
    }

    let db = match Database::open(&config.database_path).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(%err, path = %config.database_path, "failed to open database");
            std::process::exit(1);
        }
    };

    let tracker = Tracker::new(
        Arc::new(db),
        Arc::new(StatusPingClient::new(config.query_timeout)),
        config.servers.clone(),
    )
    .with_prune_policy(config.prune);
    let state = Arc::new(AppState::new(tracker));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pollers = Scheduler::for_servers(&config.servers, config.poll_interval)
        .spawn(state.clone(), shutdown_rx);

    let app = create_app(state, config.request_timeout);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!("Server listening on {}", addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await;
    if let Err(e) = result {
        tracing::error!("Axum server error: {}", e);
    }

    let _ = shutdown_tx.send(true);
    for poller in pollers {
        let _ = poller.await;
    }
}
