//! HTTP review API for `taskroute` interaction logs and feedback.
//!
//! `taskroute-web` exposes the [`ReviewService`] over a small JSON API so a
//! browser front-end (served separately, or from a static export directory)
//! can browse recent interactions, flag bad outputs, annotate flags, and
//! download CSV exports.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use taskroute::prelude::*;
//! use taskroute_web::{WebConfig, spawn_web};
//!
//! let settings = Settings::load(None)?;
//! let stores = open_stores(&settings.storage)?;
//! let service = Arc::new(ReviewService::new(
//!     stores.logs,
//!     stores.feedback,
//!     settings.review.log_window,
//! ));
//!
//! let addr = spawn_web(service, WebConfig::default()).await?;
//! println!("Review API: http://{addr}/api/logs");
//! ```
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/logs?task&model&prompt_version` | Recent interactions, newest first |
//! | GET | `/api/logs/facets` | Distinct tasks, models, and prompt versions |
//! | POST | `/api/feedback` | Flag an interaction (`{log, reason, comment?}`) |
//! | GET | `/api/feedback?task&reason&keyword` | Filtered feedback records |
//! | PATCH | `/api/feedback/{id}` | Update `comment` and/or `reviewed` |
//! | GET | `/api/feedback/export?task&reason&keyword` | Filtered feedback as CSV |

mod api;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use taskroute::review::ReviewService;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Directory of a static front-end build to serve for non-API paths.
    ///
    /// If `None`, only the API is served.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(
    service: Arc<ReviewService>,
    config: WebConfig,
) -> std::io::Result<SocketAddr> {
    let router = server::build_router(service, config.static_dir);
    server::start_server(router, config.bind_addr).await
}
