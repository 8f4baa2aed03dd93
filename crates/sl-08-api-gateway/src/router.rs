//! Route table and middleware wiring.

use crate::domain::config::GatewayConfig;
use crate::domain::error::ApiError;
use crate::handlers::{
    agreements, auth, bills, dashboard, dfs, notifications, payments, system, users,
};
use crate::middleware::{create_cors_layer, MiddlewareStack};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;

/// Build the full application with a fresh middleware stack.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let stack = MiddlewareStack::from_config(config);
    router_with_middleware(state, config, &stack)
}

/// Build the application around an existing middleware stack, so the caller
/// keeps a handle on shared middleware state (rate-limit buckets).
pub fn router_with_middleware(
    state: AppState,
    config: &GatewayConfig,
    stack: &MiddlewareStack,
) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(&config.cors))
        .layer(stack.tracing.clone())
        .layer(stack.timeout.clone())
        .layer(stack.rate_limit.clone())
        .layer(stack.body_limit.clone());

    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.limits.max_upload_size))
        .layer(middleware)
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        // Users
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/users/:id/password", post(users::reset_password))
        // Bills
        .route("/bills", get(bills::list).post(bills::submit))
        .route(
            "/bills/:id",
            get(bills::get).put(bills::update).delete(bills::delete),
        )
        .route("/bills/:id/review", post(bills::review))
        .route("/bills/:id/paid", post(bills::mark_paid))
        .route(
            "/bills/:id/attachment",
            get(bills::attachment).post(bills::attach),
        )
        // Payment requests
        .route("/payments", get(payments::list).post(payments::request))
        .route("/payments/:id", get(payments::get).delete(payments::cancel))
        .route("/payments/:id/decision", post(payments::decide))
        // Document forwarding
        .route("/dfs", get(dfs::list_all).post(dfs::upload))
        .route("/dfs/inbox", get(dfs::inbox))
        .route("/dfs/uploaded", get(dfs::uploaded))
        .route("/dfs/involved", get(dfs::involved))
        .route("/dfs/:id", get(dfs::get).delete(dfs::delete))
        .route("/dfs/:id/trail", get(dfs::trail))
        .route("/dfs/:id/file", get(dfs::download))
        .route("/dfs/:id/forward", post(dfs::forward))
        .route("/dfs/:id/status", post(dfs::set_status))
        // Agreements
        .route(
            "/agreements",
            get(agreements::list).post(agreements::issue),
        )
        .route(
            "/agreements/:id",
            get(agreements::open).delete(agreements::delete),
        )
        .route("/agreements/:id/file", get(agreements::download))
        .route("/agreements/:id/sign", post(agreements::sign))
        .route("/agreements/:id/reject", post(agreements::reject))
        .route("/agreements/:id/withdraw", post(agreements::withdraw))
        // Notifications
        .route("/notifications", get(notifications::list))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/broadcast", post(notifications::broadcast))
        .route("/notifications/:id", axum::routing::delete(notifications::delete))
        .route("/notifications/:id/read", post(notifications::mark_read))
        // Dashboard
        .route("/dashboard", get(dashboard::dashboard))
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such route")
}
