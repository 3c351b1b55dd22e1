use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Admin routes require `Authorization: Bearer <key>` once an admin API key is
/// configured. Without one they are open.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = &state.admin_api_key else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected.expose_secret() => Ok(next.run(request).await),
        _ => {
            warn!(
                event_name = "api.auth.rejected",
                path = %request.uri().path(),
                "admin request without a valid API key"
            );
            Err(ApiError::unauthorized())
        }
    }
}
