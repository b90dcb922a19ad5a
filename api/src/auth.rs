//! Static bearer token gate for private routes

use crate::metrics::AUTH_FAILURES_TOTAL;
use crate::model::ErrorResponse;
use crate::rest::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

/// Identity resolved from the token
pub const ADMIN_USER_ID: &str = "user_admin";

/// Authenticated caller, inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

pub struct AuthError(&'static str);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AUTH_FAILURES_TOTAL.inc();
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError("Missing Authorization header"))?;

    let token = match value.split_once(' ') {
        Some(("Bearer", token)) if !token.contains(' ') => token,
        _ => return Err(AuthError("Invalid token format")),
    };

    if token != state.auth_token.as_ref() {
        debug!("Rejected request with unknown bearer token");
        return Err(AuthError("Invalid token"));
    }

    req.extensions_mut().insert(AuthUser {
        user_id: ADMIN_USER_ID.to_string(),
    });

    Ok(next.run(req).await)
}
