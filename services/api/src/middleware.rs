//! Authentication middleware for JWT token validation

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{error::ApiError, state::AppState};

/// Verified caller identity attached to every authenticated request
///
/// Produced once by the middleware after token verification; handlers pass
/// it explicitly into every service call.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: i64,
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract the Authorization header
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    // Check if it's a Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    // Validate the token
    let claims = state.jwt.verify(token).map_err(|_| ApiError::Unauthorized)?;

    // Attach the verified identity to the request
    req.extensions_mut().insert(CallerIdentity {
        user_id: claims.sub,
    });

    // Call the next service
    let response = next.run(req).await;

    Ok(response)
}
