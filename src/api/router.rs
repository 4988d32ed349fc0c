use super::handlers;
use super::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let enable_cors = state.enable_cors;

    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/plugins", get(handlers::list_plugins))
        .route("/blueprints/validate", post(handlers::validate_blueprint))
        .route("/runs", post(handlers::submit_run))
        .route("/runs/:id", get(handlers::get_run).delete(handlers::cancel_run))
        .route("/runs/:id/logs", get(handlers::get_logs))
        .route("/runs/:id/artifacts", get(handlers::get_artifacts))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}
