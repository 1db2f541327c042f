//! Axum server setup and router construction.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch};
use taskroute::review::ReviewService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::api::{self, AppState};

/// Build the full axum router.
///
/// The router serves the REST API at `/api/*` and, optionally, static files
/// for the front-end build.
pub fn build_router(service: Arc<ReviewService>, static_dir: Option<PathBuf>) -> Router {
    let app_state = AppState { service };

    // The front-end dev server runs on a different port.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/logs", get(api::get_logs))
        .route("/api/logs/facets", get(api::get_facets))
        .route(
            "/api/feedback",
            get(api::get_feedback).post(api::post_feedback),
        )
        .route("/api/feedback/export", get(api::export_feedback))
        .route("/api/feedback/{id}", patch(api::patch_feedback))
        .with_state(app_state);

    let mut router = Router::new().merge(api_routes).layer(cors);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
}

/// Bind the listener, start serving in the background, and return the bound
/// address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;
    info!("Review API listening on http://{addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Review API server stopped: {e}");
        }
    });

    Ok(addr)
}
