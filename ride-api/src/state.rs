//! Application State

use ride_db::{CancellationService, CancellationStore, ServiceConfig};
use std::sync::Arc;

use crate::middleware::{AuthState, JwtConfig};

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CancellationService>,
    pub auth: AuthState,
    pub version: String,
}

impl AppState {
    pub fn new(store: Arc<dyn CancellationStore>, config: ServiceConfig, jwt: JwtConfig) -> Self {
        Self {
            service: Arc::new(CancellationService::new(store, config)),
            auth: AuthState::new(jwt),
            version: crate::VERSION.to_string(),
        }
    }
}
