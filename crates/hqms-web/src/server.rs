//! Web服务器

use axum::{
    routing::{get, patch, post},
    Router,
};
use hqms_core::Result;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    amend_entry, api_root, call_next, cancel, check_in, complete_service, display_board, health,
    list_queue, recently_called, start_service, stats, AppState,
};

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let app = Self::create_app(state);
        Self { addr, app }
    }

    fn create_app(state: AppState) -> Router {
        Router::new()
            // 根路径
            .route("/", get(api_root))
            // 健康检查
            .route("/health", get(health))
            // API路由
            .nest("/api/v1", api_routes())
            .with_state(state)
            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    ),
            )
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| hqms_core::HqmsError::Internal(format!("Web server failed: {}", e)))?;

        Ok(())
    }
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .route("/queue", get(list_queue).post(check_in))
        .route("/queue/stats", get(stats))
        .route("/queue/recently-called", get(recently_called))
        .route("/queue/call-next", post(call_next))
        .route("/queue/:id", patch(amend_entry))
        .route("/queue/:id/start", post(start_service))
        .route("/queue/:id/complete", post(complete_service))
        .route("/queue/:id/cancel", post(cancel))
        .route("/display", get(display_board))
}
