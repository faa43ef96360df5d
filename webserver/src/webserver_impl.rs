//! Main webserver implementation
//!
//! Builds the axum router over the fleet and serves it until a shutdown
//! signal arrives.

use axum::routing::{get, post, put};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use supervisor::Fleet;

use crate::error::{WebServerError, WebServerResult};
use crate::state::AppState;
use crate::web::handlers::{api, static_files, websocket};

#[derive(Clone)]
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(fleet: Arc<Fleet>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(AppState::new(fleet, static_dir)),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            // Frontend
            .route("/", get(static_files::serve_index))
            .nest_service("/static", static_files::static_assets(&self.state.static_dir))
            // Live status push
            .route("/ws", get(websocket::websocket_handler))
            // Channel API
            .route("/api/channels", get(api::list_channels).post(api::create_channel))
            .route("/api/channels/:id", put(api::update_channel))
            .route("/api/start/:id", post(api::start_channel))
            .route("/api/stop/:id", post(api::stop_channel))
            .route("/api/restart/:id", post(api::restart_channel))
            // Health check
            .route("/health", get(api::health_check))
            .layer(ServiceBuilder::new().layer(CorsLayer::permissive()).into_inner())
            .with_state(Arc::clone(&self.state))
    }

    /// Bind `addr` and serve until `shutdown` resolves
    pub async fn run<F>(&self, addr: SocketAddr, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| WebServerError::startup(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!("🌐 Web server listening on http://{}", local_addr);
        info!("📊 Dashboard available at http://{}/", local_addr);

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
