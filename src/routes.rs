//! HTTP router assembly.

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, put},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// The auth middleware wraps every route; bypass prefixes in the gate settings
/// decide which of them are public.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Public by default (bypass prefix)
        .route("/health", get(handlers::health::health_check))
        // Client-facing model listing
        .route("/v1/models", get(handlers::models::list_models))
        .route("/v1beta/models", get(handlers::models::list_models))
        // Registry management, admin keys only
        .route(
            "/v0/management/providers/{provider}/connections/{connection_id}/models",
            put(handlers::management::register_models),
        )
        .route(
            "/v0/management/providers/{provider}/connections/{connection_id}",
            delete(handlers::management::unregister_connection),
        )
        .route(
            "/v0/management/providers/{provider}/models",
            get(handlers::management::provider_models),
        )
        .route(
            "/v0/management/providers/{provider}/models/{model_id}",
            get(handlers::management::provider_model),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
