//! Top-level router.
//!
//! # Route Structure
//!
//! - `GET  /{code}`  - Short URL redirect (public)
//! - `GET  /health`  - Health check: database, cache, access queue (public)
//! - `/api/*`        - Management API (bearer token when tokens are configured)
//!
//! # Middleware
//!
//! Outermost first: path normalization, rate limiting, tracing, request
//! metrics, then authentication on `/api` only.

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::{auth, metrics, rate_limit, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// Serve it with connect info so the rate limiter can key on the peer
/// address:
///
/// ```rust,ignore
/// axum::serve(
///     listener,
///     ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
/// )
/// ```
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// The routes and middleware of [`app_router`] without trailing-slash
/// normalization.
pub fn router(state: AppState) -> Router {
    let api_router = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));

    Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .layer(middleware::from_fn(metrics::layer))
        .layer(tracing::layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::layer,
        ))
        .with_state(state)
}
