use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware::from_fn, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

/// HTTP ingress: owns the public router (service routes plus `/`, `/health`
/// and the JSON 404 fallback), its middleware stack and the listener.
#[derive(Debug, Clone, Default)]
pub struct ApiIngress {
    config: ApiIngressConfig,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Merge service routes with the built-in ones and wrap everything in
    /// the middleware stack.
    pub fn build_router(&self, routes: Router) -> Router {
        tracing::debug!("Building router");
        let mut router = routes
            .route("/", get(web::welcome))
            .route("/health", get(web::health_check))
            .fallback(web::not_found);

        // Layers wrap what is already there, so they are added innermost first.
        // Resulting order (outermost to innermost):
        // PropagateRequestId -> SetRequestId -> push_req_id_to_extensions -> Trace -> Timeout -> CORS -> BodyLimit
        let x_request_id = crate::request_id::header();

        // 7. Body limit
        router = router.layer(RequestBodyLimitLayer::new(self.config.body_limit_bytes));

        // 6. CORS (if enabled)
        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        // 5. Timeout for handlers (408 on expiry)
        if self.config.timeout_sec > 0 {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeout_sec,
            )));
        }

        // 4. Trace with request_id/status/latency
        router = router.layer(crate::request_id::create_trace_layer());

        // 3. Put request_id into extensions and span
        router = router.layer(from_fn(crate::request_id::push_req_id_to_extensions));

        // 2. Generate x-request-id when missing
        router = router.layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            crate::request_id::MakeReqId,
        ));

        // 1. Echo x-request-id back to the client
        router.layer(PropagateRequestIdLayer::new(x_request_id))
    }

    /// Bind `bind_addr` and serve until `shutdown` resolves.
    pub async fn serve<F>(&self, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.config.bind_addr.parse().map_err(|e| {
            anyhow::anyhow!("Invalid bind address '{}': {}", self.config.bind_addr, e)
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        serve_on(listener, router, shutdown).await
    }
}

/// Serve on an already bound listener until `shutdown` resolves, then drain
/// in-flight requests.
pub async fn serve_on<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("HTTP server bound on {}", listener.local_addr()?);

    let shutdown = async move {
        shutdown.await;
        tracing::info!("HTTP server shutting down gracefully");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
