//! API Server setup

use axum::Router;
use ride_db::{CancellationStore, MemoryDatastore, PgDatastore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::router::create_router;
use crate::state::AppState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const PG_MAX_CONNECTIONS: u32 = 10;

/// Open the configured datastore. Postgres gets its schema applied.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn CancellationStore>, BoxError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store = PgDatastore::connect(url, PG_MAX_CONNECTIONS).await?;
            store.init_schema().await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory datastore (development mode)");
            Ok(Arc::new(MemoryDatastore::new()))
        }
    }
}

/// Build the router with its middleware stack and the bind address
pub fn create_server(
    config: &ServerConfig,
    store: Arc<dyn CancellationStore>,
) -> Result<(Router, SocketAddr), BoxError> {
    let jwt = config.jwt_config()?;
    let state = AppState::new(store, config.service_config(), jwt);

    let mut router = create_router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port).parse()?;
    Ok((router, addr))
}

/// Run the API server until it fails
pub async fn run_server(config: ServerConfig) -> Result<(), BoxError> {
    let store = open_store(&config).await?;
    let (router, addr) = create_server(&config, store)?;

    info!("Ride cancellation API listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
