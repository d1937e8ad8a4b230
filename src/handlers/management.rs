//! Model registration endpoints for upstream connections.
//!
//! This module implements the admin-only registry API:
//! - PUT /v0/management/providers/{provider}/connections/{connection_id}/models
//! - DELETE /v0/management/providers/{provider}/connections/{connection_id}
//! - GET /v0/management/providers/{provider}/models
//! - GET /v0/management/providers/{provider}/models/{model_id}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::model::ModelDescriptor,
    services::model_events::ModelEvent,
    state::AppState,
};

/// Only admin keys may touch the registry. A request that reached a handler
/// without a context came in through a bypass prefix and is refused too.
fn require_admin(auth: Option<Extension<AuthContext>>) -> Result<AuthContext, AppError> {
    match auth {
        Some(Extension(ctx)) if ctx.is_admin => Ok(ctx),
        _ => Err(AppError::Forbidden),
    }
}

/// Replace the model list of one upstream connection.
///
/// # Request Body
///
/// ```json
/// [
///   { "id": "claude-sonnet-4", "display_name": "Claude Sonnet 4" },
///   { "id": "claude-opus-4" }
/// ]
/// ```
///
/// # Response
///
/// - **204 No Content**: registered
/// - **400**: a descriptor has an empty id
/// - **403**: caller is not an admin
pub async fn register_models(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path((provider, connection_id)): Path<(String, String)>,
    Json(models): Json<Vec<ModelDescriptor>>,
) -> Result<StatusCode, AppError> {
    let ctx = require_admin(auth)?;

    if models.iter().any(|m| m.id.trim().is_empty()) {
        return Err(AppError::InvalidRequest(
            "Model id must not be empty".to_string(),
        ));
    }

    tracing::debug!(api_key_id = %ctx.api_key_id, %provider, %connection_id, "registration via management api");
    state.events.publish(ModelEvent::Registered {
        provider,
        connection_id,
        models,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Forget one upstream connection's models.
pub async fn unregister_connection(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path((provider, connection_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    require_admin(auth)?;

    state.events.publish(ModelEvent::Unregistered {
        provider,
        connection_id,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Merged model list of one provider.
pub async fn provider_models(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(provider): Path<String>,
) -> Result<Json<Vec<ModelDescriptor>>, AppError> {
    require_admin(auth)?;
    Ok(Json(state.registry().snapshot_by_provider(&provider)))
}

/// One model of one provider, matched case-insensitively.
pub async fn provider_model(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path((provider, model_id)): Path<(String, String)>,
) -> Result<Json<ModelDescriptor>, AppError> {
    require_admin(auth)?;
    state
        .registry()
        .get_by_provider_and_id(&provider, &model_id)
        .map(Json)
        .ok_or(AppError::ModelNotFound)
}
