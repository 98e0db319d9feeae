//! Standalone HTTP server around the proxy middleware.
//!
//! # Responsibilities
//! - Create an Axum Router whose fallback is the "next handler" (404)
//! - Wire up middleware (tracing, request ID, proxy)
//! - Bind server to listener and serve until shutdown

use axum::{
    http::{HeaderName, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::middleware::{proxy_middleware, HttpProxy};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// HTTP server hosting a single proxy instance.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(proxy: HttpProxy) -> Self {
        Self {
            router: Self::build_router(proxy),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(proxy: HttpProxy) -> Router {
        Router::new().fallback(not_proxied).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(from_fn_with_state(proxy, proxy_middleware)),
        )
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Next handler for requests outside the proxy context.
async fn not_proxied() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not proxied")
}
