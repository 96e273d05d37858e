//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Look the code up in the cache
/// 2. On a miss or cache error, read durable storage and refresh the cache
/// 3. Hand an access event to the accounting worker (never awaited)
/// 4. Return 307 Temporary Redirect
///
/// A full access queue drops the event; the redirect is still served.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let target = state.link_service.resolve(&code).await?;
    Ok(Redirect::temporary(&target))
}
