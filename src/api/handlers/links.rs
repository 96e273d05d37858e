//! Handlers for the `/api/shorten` resource.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::shorten::ShortenRequest;
use crate::api::dto::update_link::UpdateLinkRequest;
use crate::application::services::Identity;
use crate::domain::entities::ShortUrl;
use crate::error::AppError;
use crate::state::AppState;

/// Maps body extraction failures onto the JSON error shape.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(inner)| inner).map_err(|rejection| {
        AppError::bad_request(
            "Invalid request body",
            json!({ "reason": rejection.body_text() }),
        )
    })
}

/// Shortens a URL.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/some/long/path" }
/// ```
///
/// # Response
///
/// `201 Created` with the new record:
///
/// ```json
/// {
///   "id": 1,
///   "shortCode": "aZ3kQ9",
///   "originalUrl": "https://example.com/some/long/path",
///   "accessCount": 0,
///   "createdAt": "2025-01-01T00:00:00Z",
///   "updatedAt": "2025-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - 400 if the URL is missing, too long, not http(s) or contains a dangerous scheme
/// - 409 if no free code was found within the attempt budget
pub async fn create_link_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortUrl>), AppError> {
    let payload = body(payload)?;
    payload.validate()?;

    let record = state
        .link_service
        .create_short_url(&payload.url, identity.owner_id)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Returns the record for a code without counting an access.
///
/// `GET /api/shorten/{code}`
pub async fn get_link_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ShortUrl>, AppError> {
    Ok(Json(state.link_service.get(&code).await?))
}

/// Points a code at a new URL.
///
/// # Endpoint
///
/// `PUT /api/shorten/{code}`
///
/// The cached entry is invalidated so the next redirect uses the new target.
///
/// # Errors
///
/// - 400 if the new URL is rejected
/// - 404 if the code doesn't exist
pub async fn update_link_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<UpdateLinkRequest>, JsonRejection>,
) -> Result<Json<ShortUrl>, AppError> {
    let payload = body(payload)?;
    payload.validate()?;

    let record = state.link_service.update(&code, &payload.url).await?;
    Ok(Json(record))
}

/// Deletes a code.
///
/// `DELETE /api/shorten/{code}` returns 204, or 404 if the code doesn't exist.
pub async fn delete_link_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the authoritative record, including `accessCount`.
///
/// # Endpoint
///
/// `GET /api/shorten/{code}/stats`
///
/// Reads durable storage only. Accesses still waiting in the accounting
/// queue are not yet reflected.
pub async fn stats_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ShortUrl>, AppError> {
    Ok(Json(state.link_service.stats(&code).await?))
}
