use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ivd_api::background::session_sweeper;
use ivd_api::config::{read_district_seed, ServerConfig, StoreBackend};
use ivd_api::router::build_app_router;
use ivd_api::state::AppState;
use ivd_core::store::memory::InMemoryStore;
use ivd_core::store::DatasetStore;
use ivd_supabase::{SupabaseConfig, SupabaseStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ivd_api=debug,ivd_flows=debug,ivd_supabase=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = config.store_backend.as_str(),
        "Loaded server configuration"
    );

    // --- Store ---
    let store = build_store(&config);
    match store.list_districts().await {
        Ok(districts) => tracing::info!(districts = districts.len(), "Store reachable"),
        Err(e) => tracing::warn!(error = %e, "Store not reachable at startup, continuing"),
    }

    // --- App state ---
    let state = AppState::new(config.clone(), store);

    // --- Session sweeper ---
    let sweeper_cancel = CancellationToken::new();
    let sweeper_handle = tokio::spawn(session_sweeper::run(
        Arc::clone(&state.sessions),
        Duration::from_secs(config.session_idle_timeout_secs),
        sweeper_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweeper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;
    tracing::info!("Session sweeper stopped");

    let orphans = state.orphans.len();
    if orphans > 0 {
        tracing::warn!(orphans, "Orphaned images left unreconciled at shutdown");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Construct the configured backend.
///
/// Panics on missing Supabase settings or an unreadable seed file; the
/// server cannot do anything useful without its store.
fn build_store(config: &ServerConfig) -> Arc<dyn DatasetStore> {
    match config.store_backend {
        StoreBackend::Supabase => {
            let supabase = SupabaseConfig::from_env().expect("Invalid Supabase configuration");
            tracing::info!(
                url = %supabase.base_url,
                bucket = %supabase.bucket,
                "Using Supabase store"
            );
            Arc::new(SupabaseStore::new(supabase))
        }
        StoreBackend::Memory => {
            let districts = match &config.district_seed_file {
                Some(path) => read_district_seed(path).expect("Failed to load district seed"),
                None => Vec::new(),
            };
            tracing::info!(districts = districts.len(), "Using in-memory store");
            Arc::new(InMemoryStore::new(districts))
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
