//! Gateway service: validated config, router, and the HTTP server loop.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::middleware::{rate_limit, MiddlewareStack};
use crate::router::router_with_middleware;
use crate::state::AppState;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// How often idle rate-limit buckets are swept.
const BUCKET_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The portal's HTTP front end.
pub struct ApiGatewayService {
    config: GatewayConfig,
    middleware: MiddlewareStack,
    router: Router,
}

impl ApiGatewayService {
    /// Validate `config` and assemble the router.
    pub fn new(config: GatewayConfig, state: AppState) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let middleware = MiddlewareStack::from_config(&config);
        let router = router_with_middleware(state, &config, &middleware);

        Ok(Self {
            config,
            middleware,
            router,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// A clone of the application, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;

        let sweeper = tokio::spawn(rate_limit::cleanup_task(
            self.middleware.rate_limit_state(),
            BUCKET_SWEEP_INTERVAL,
        ));

        info!(addr = %addr, "HTTP server listening");
        let result = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GatewayError::Serve(e.to_string()));

        sweeper.abort();
        info!("HTTP server stopped");
        result
    }
}
