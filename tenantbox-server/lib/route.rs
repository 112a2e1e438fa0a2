//! Router configuration for the tenantbox server.
//!
//! Every route answers methods it does not accept with a JSON 405, and unknown paths get a JSON
//! 404 from the router fallback.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handler, middleware as app_middleware, state::AppState};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Create a new router with the given state
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/launch",
            post(handler::launch).fallback(handler::method_not_allowed),
        )
        .route(
            "/launch/",
            delete(handler::delete_without_id).fallback(handler::method_not_allowed),
        )
        .route(
            "/launch/{id}",
            delete(handler::delete_tenant).fallback(handler::method_not_allowed),
        )
        .route(
            "/containers",
            get(handler::list_containers).fallback(handler::method_not_allowed),
        )
        .route(
            "/containers/{id}/logs",
            get(handler::container_logs)
                .post(handler::control_container_reserved)
                .fallback(handler::method_not_allowed),
        )
        .route(
            "/containers/{id}/inspect",
            get(handler::container_inspect)
                .post(handler::control_container_reserved)
                .fallback(handler::method_not_allowed),
        )
        .route(
            "/containers/{id}/{action}",
            post(handler::control_container).fallback(handler::method_not_allowed),
        )
        .route(
            "/templates",
            get(handler::list_templates).fallback(handler::method_not_allowed),
        )
        .route(
            "/volumes",
            get(handler::list_volumes).fallback(handler::method_not_allowed),
        )
        .route(
            "/health",
            get(handler::health).fallback(handler::method_not_allowed),
        );

    // The bare launch route predates the /api prefix
    Router::new()
        .route(
            "/launch",
            post(handler::launch).fallback(handler::method_not_allowed),
        )
        .nest("/api", api)
        .fallback(handler::fallback)
        .layer(middleware::from_fn(app_middleware::logging_middleware))
        .with_state(state)
}
