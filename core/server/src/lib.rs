//! HTTP transport for NoteVault.
//!
//! Exposes the store's operations as JSON endpoints under `/files` and maps
//! the store's error taxonomy onto HTTP status codes. Authentication is not
//! handled here; deploy behind whatever gate admits callers.

pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use notevault_common::{Error, Result};
use notevault_store::{LocalVault, VaultStore};

pub use api::router;
pub use config::ServerConfig;
pub use error::ApiError;

/// Build the full application: routes plus CORS and request tracing.
///
/// # Errors
/// - An allowed origin is not a valid header value
pub fn app(store: Arc<dyn VaultStore>, config: &ServerConfig) -> Result<Router> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| Error::Config(format!("Invalid origin '{}': {}", origin, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(router(store)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Open the configured vault and serve it until Ctrl-C.
///
/// # Errors
/// - Vault cannot be opened
/// - Bind address unavailable
pub async fn serve(config: ServerConfig) -> Result<()> {
    let store: Arc<dyn VaultStore> = Arc::new(LocalVault::open(&config.vault)?);
    let app = app(store.clone(), &config)?;

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|e| Error::from_io(e, config.bind))?;

    info!(
        addr = %config.bind,
        root = %store.root().path().display(),
        "Serving vault"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| Error::from_io(e, "server"))?;

    info!("Server stopped");
    Ok(())
}
