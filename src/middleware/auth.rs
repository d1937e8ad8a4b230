//! API key authentication middleware.
//!
//! This middleware intercepts every request to:
//! 1. Run the authentication gate (bypass check, credential, key, entitlement)
//! 2. Inject the resulting [`AuthContext`] into the request
//! 3. Reject unauthorized or unfunded requests with the gate's error

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

pub use crate::services::gate::AuthContext;

/// API key authentication middleware function.
///
/// # Returns
///
/// - `Ok(Response)` for public paths, or when authenticated (context attached)
/// - `Err(AppError)` otherwise: 401, 402, 429 or 500 depending on the failure
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = state
        .gate
        .authenticate(request.uri().path(), request.uri().query(), request.headers())
        .await?;

    // Route handlers can now extract this using Extension<AuthContext>
    if let Some(context) = context {
        request.extensions_mut().insert(context);
    }

    Ok(next.run(request).await)
}
