//! Per-client admission control in front of every route.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Duration;

use crate::application::services::Decision;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_key::client_key;

/// Admits or rejects a request using the shared [`RateLimiter`](crate::application::services::RateLimiter).
///
/// # Key Extraction
///
/// The socket peer IP, read from [`ConnectInfo`] when the server was started
/// with connect info. With `behind_proxy` set, the first `X-Forwarded-For`
/// entry or `X-Real-IP` takes precedence. Requests with no usable origin share
/// one bucket.
///
/// # Errors
///
/// Returns `429 Too Many Requests` with `Retry-After` when the client's bucket
/// is empty. A rejected request never reaches the handler.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/{code}", get(redirect_handler))
///     .layer(middleware::from_fn_with_state(state.clone(), rate_limit::layer));
/// ```
pub async fn layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), peer, state.behind_proxy);

    match state.rate_limiter.check(&key) {
        Decision::Allowed => Ok(next.run(req).await),
        Decision::Denied { retry_after } => {
            metrics::counter!("rate_limit_rejections_total").increment(1);
            tracing::debug!(client = %key, "Rate limit exceeded");
            Err(AppError::rate_limited(whole_seconds(retry_after)))
        }
    }
}

/// Rounds up to whole seconds, at least one.
fn whole_seconds(wait: Duration) -> u64 {
    let secs = wait
        .as_secs()
        .saturating_add(u64::from(wait.subsec_nanos() > 0));
    secs.max(1)
}
