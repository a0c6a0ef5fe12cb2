//! HTTP server using axum.

pub mod routes;

use crate::config::ServerConfig;
use crate::service::NotesService;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub service: NotesService,
}

/// Build the full application: API routes, attachments, optional frontend
pub fn router(service: NotesService, config: &ServerConfig) -> Router {
    let uploads = ServeDir::new(service.attachments().dir());
    let state = AppState { service };

    let mut app = Router::new()
        .merge(routes::routes())
        .nest_service("/uploads", uploads)
        .with_state(state);

    if let Some(static_dir) = config.resolve_static_dir() {
        tracing::info!("serving frontend from {}", static_dir.display());
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    app.layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// CORS policy: any origin when none are configured, otherwise the given
/// list with credentials allowed.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::HEAD,
        Method::PUT,
        Method::PATCH,
        Method::POST,
        Method::DELETE,
    ];

    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Run the server until interrupted
pub async fn run(config: ServerConfig) -> Result<()> {
    let data_dir = config.resolve_data_dir();
    let upload_dir = config.resolve_upload_dir();
    let service = NotesService::open(&data_dir, &upload_dir).with_context(|| {
        format!(
            "Failed to open storage (data: {}, uploads: {})",
            data_dir.display(),
            upload_dir.display()
        )
    })?;
    tracing::info!(
        "data in {}, uploads in {}",
        service.data_dir().display(),
        service.attachments().dir().display()
    );

    let app = router(service, &config);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
