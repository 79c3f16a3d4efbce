//! Route configuration.

use crate::error::ApiError;
use crate::handlers;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Refuse entity traffic until the first reconciliation run has succeeded.
async fn readiness_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.readiness.is_initialized() {
        return ApiError::ServiceUnavailable("presence initialization in progress".to_string())
            .into_response();
    }
    next.run(req).await
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/1.0/tenants", get(handlers::list_tenants))
        .route("/1.0/users", get(handlers::list_users))
        .route("/1.0/users/{uuid}", get(handlers::get_user))
        .route(
            "/1.0/users/{uuid}/presences",
            put(handlers::update_user_presence),
        )
        .route("/1.0/lines", get(handlers::list_lines))
        .route("/1.0/sessions", get(handlers::list_sessions))
        .route("/1.0/devices", get(handlers::list_devices))
        .route(
            "/1.0/rooms",
            get(handlers::list_rooms).post(handlers::create_room),
        )
        .route("/1.0/rooms/{uuid}", get(handlers::get_room))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            readiness_middleware,
        ));

    Router::new()
        // Status is intentionally ungated for probes and stuck-startup diagnosis
        .route("/1.0/status", get(handlers::status))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
