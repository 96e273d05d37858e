//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: database and access queue healthy. `status` is `degraded`
///   when only the cache is failing, since redirects still resolve from storage.
/// - **503 Service Unavailable**: `status` is `unhealthy`; the database or the
///   access queue is failing
///
/// # Components Checked
///
/// 1. **Database**: `SELECT 1` through the repository
/// 2. **Cache**: backend ping; a disabled cache reports ok
/// 3. **Access queue**: worker still running, free slots
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "cache": { "status": "ok", "message": "redis connected" },
///     "access_queue": { "status": "ok", "message": "Free slots: 10000 of 10000" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = check_database(&state).await;
    let cache = check_cache(&state).await;
    let access_queue = check_access_queue(&state);

    let serving = database.is_ok() && access_queue.is_ok();
    let status = match (serving, cache.is_ok()) {
        (false, _) => "unhealthy",
        (true, false) => "degraded",
        (true, true) => "healthy",
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            cache,
            access_queue,
        },
    };

    if serving {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.repository.ping().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {e}")),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    let backend = state.cache.backend_name();
    if backend == "none" {
        return CheckStatus::ok("Cache disabled");
    }

    if state.cache.health_check().await {
        CheckStatus::ok(format!("{backend} connected"))
    } else {
        CheckStatus::error(format!("{backend} unreachable"))
    }
}

fn check_access_queue(state: &AppState) -> CheckStatus {
    if state.recorder.is_closed() {
        CheckStatus::error("Access queue is closed")
    } else {
        CheckStatus::ok(format!(
            "Free slots: {} of {}",
            state.recorder.capacity(),
            state.recorder.max_capacity()
        ))
    }
}
