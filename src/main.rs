use almacen_intake::{
    api::{self, AppState},
    config::{Settings, database},
    errors::Result,
    ledger::AppsScriptLedger,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load settings (config.toml + environment)
    let settings = Settings::load().inspect_err(|e| error!("Failed to load settings: {}", e))?;
    if settings.admin_key().is_none() {
        warn!("ADMIN_KEY is not set; admin endpoints will refuse every request");
    }
    if !settings.ledger_configured() {
        warn!("APPS_SCRIPT_URL is not set; count validation by batch code will fail");
    }

    // 4. Initialize database
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Serve
    let ledger = AppsScriptLedger::from_settings(&settings)?;
    let port = settings.port;
    let app = api::router(AppState::new(db, settings, Arc::new(ledger)));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
