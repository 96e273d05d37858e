//! API route configuration.
//!
//! Mounted under `/api` and guarded by [`crate::api::middleware::auth`].

use crate::api::handlers::{
    create_link_handler, delete_link_handler, get_link_handler, stats_handler,
    update_link_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Short URL management routes.
///
/// # Endpoints
///
/// - `POST   /shorten`              - Create a short URL
/// - `GET    /shorten/{code}`       - Fetch a record
/// - `PUT    /shorten/{code}`       - Change the target URL
/// - `DELETE /shorten/{code}`       - Delete a record
/// - `GET    /shorten/{code}/stats` - Authoritative access count
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(create_link_handler))
        .route(
            "/shorten/{code}",
            get(get_link_handler)
                .put(update_link_handler)
                .delete(delete_link_handler),
        )
        .route("/shorten/{code}/stats", get(stats_handler))
}
