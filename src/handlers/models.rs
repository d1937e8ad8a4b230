//! Model listing for API clients.
//!
//! - GET /v1/models
//! - GET /v1beta/models

use axum::{Json, extract::State};

use crate::{
    models::model::{ModelListResponse, ModelResponse},
    state::AppState,
};

/// List every model currently registered, across all providers.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "object": "list",
///   "data": [
///     { "id": "claude-sonnet-4", "object": "model", "owned_by": "anthropic", "provider": "claude" }
///   ]
/// }
/// ```
///
/// Entries are ordered by provider, then by model id.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelListResponse> {
    let mut providers: Vec<_> = state.registry().snapshot().into_iter().collect();
    providers.sort_by(|a, b| a.0.cmp(&b.0));

    let data = providers
        .into_iter()
        .flat_map(|(provider, models)| {
            models
                .into_iter()
                .map(move |model| ModelResponse::from_descriptor(&provider, model))
        })
        .collect();

    Json(ModelListResponse {
        object: "list",
        data,
    })
}
