//! Bearer token authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;

use crate::application::services::Identity;
use crate::{error::AppError, state::AppState};

/// Resolves the caller's [`Identity`] and stores it in request extensions.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// When the identity provider has no tokens configured the header is not
/// read and every caller is anonymous.
///
/// # Errors
///
/// Returns `401 Unauthorized` with `WWW-Authenticate: Bearer` if the header
/// is missing or malformed, or the token is unknown.
///
/// # Example
///
/// ```rust,ignore
/// let protected = Router::new()
///     .route("/shorten", post(create_link_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !st.identity.requires_token() {
        let mut req = req;
        req.extensions_mut().insert(Identity::anonymous());
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();

    let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            AppError::unauthorized(
                "Unauthorized",
                serde_json::json!({"reason": "Authorization header is missing or invalid"}),
            )
        })?;

    let identity = st.identity.verify(&token).await?;
    tracing::debug!(owner = ?identity.owner_id, "Authenticated API caller");

    parts.extensions.insert(identity);
    let req = Request::from_parts(parts, body);

    Ok(next.run(req).await)
}
