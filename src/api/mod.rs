//! HTTP layer - routes, shared state and handlers
//!
//! Route names are the ones the packing forms and the counting UI already call.
//! Handlers only translate between JSON and the framework-agnostic `core`
//! functions; all business rules live there.

/// Admin-key gated endpoints
pub mod admin;
/// Batch creation and listing
pub mod batches;
/// HTTP mapping of application errors
pub mod error;
/// Liveness endpoint
pub mod health;
/// Count validation endpoints
pub mod validation;

use crate::{config::Settings, ledger::Ledger};
use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Application settings
    pub settings: Arc<Settings>,
    /// Where validated batches are recorded
    pub ledger: Arc<dyn Ledger>,
}

impl AppState {
    /// Bundles the shared handles for the router.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: Settings, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            ledger,
        }
    }
}

/// Builds the application router.
///
/// When the configured frontend directory exists its files are served for every
/// path that is not an API route.
pub fn router(state: AppState) -> Router {
    let frontend_dir = state.settings.frontend_dir.clone();

    let mut router = Router::new()
        .route("/nuevo-lote", post(batches::create_batch_handler))
        .route("/lotes", get(batches::list_batches_handler))
        .route("/validar-lote", post(validation::validate_by_id_handler))
        .route("/validar-conteo", post(validation::validate_by_code_handler))
        .route("/borrar-lotes", post(admin::delete_all_handler))
        .route("/borrar-registros", post(admin::delete_selected_handler))
        .route("/errores-conteo", get(admin::mismatch_report_handler))
        .route("/health", get(health::health_handler));

    if frontend_dir.is_dir() {
        tracing::info!("Serving frontend from {:?}", frontend_dir);
        router = router.fallback_service(ServeDir::new(frontend_dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
